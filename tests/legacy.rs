mod helpers;

use std::time::Duration;

use anyhow::{bail, Result};
use registadb::handler::{CreatePolicy, WireFormat};
use registadb::proto::object::{
    regista_object::Data, ListValue, MapValue, ObjectType, RegistaObject, StatusToken, VectorValue,
};
use registadb::LegacyClient;

use crate::helpers::{spawn_server, test_store_path};

fn string_object(id: u64, text: &str) -> RegistaObject {
    RegistaObject {
        id,
        object_type: ObjectType::String as i32,
        timestamp: 0,
        data: Some(Data::Blob(text.as_bytes().to_vec())),
    }
}

/// Fetches `id` until the server reports it, bounded so a lost ingest frame
/// fails the test instead of hanging it.
async fn fetch_until_found(client: &mut LegacyClient, id: u64) -> Result<RegistaObject> {
    for _attempt in 0..50 {
        if let Some(object) = client.fetch(id).await? {
            return Ok(object);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("object {id} never became visible")
}

#[tokio::test]
async fn test_push_then_fetch() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_push"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr)
        .await?
        .with_reply_timeout(Duration::from_secs(5));

    client.push_object(string_object(3, "mezzala")).await;
    let fetched = fetch_until_found(&mut client, 3).await?;
    assert_eq!(fetched.id, 3);
    assert_eq!(fetched.data, Some(Data::Blob(b"mezzala".to_vec())));
    assert!(fetched.timestamp > 0);

    server.shutdown().await
}

#[tokio::test]
async fn test_store_is_acknowledged_with_a_token() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_store"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;

    let token = client.store(string_object(4, "carrilero")).await?;
    assert_eq!(token, StatusToken::Ok);

    let fetched = client.fetch(4).await?;
    assert_eq!(
        fetched.and_then(|object| object.data),
        Some(Data::Blob(b"carrilero".to_vec()))
    );

    server.shutdown().await
}

#[tokio::test]
async fn test_delete_lifecycle() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_delete"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;

    let _token = client.store(string_object(9, "temporary")).await?;
    assert_eq!(client.delete(9).await?, StatusToken::Ok);
    assert_eq!(client.fetch(9).await?, None);
    assert_eq!(client.delete(9).await?, StatusToken::NotFound);
    assert_eq!(client.delete(404).await?, StatusToken::NotFound);

    server.shutdown().await
}

#[tokio::test]
async fn test_incoherent_objects_are_rejected() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_mismatch"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;

    // Declared as a list but carrying a blob.
    let incoherent = RegistaObject {
        id: 8,
        object_type: ObjectType::List as i32,
        timestamp: 0,
        data: Some(Data::Blob(b"not a list".to_vec())),
    };
    assert_eq!(client.store(incoherent).await?, StatusToken::TypeMismatch);
    assert_eq!(client.fetch(8).await?, None);

    server.shutdown().await
}

#[tokio::test]
async fn test_every_type_round_trips() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_types"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;

    let objects = [
        string_object(1, "plain string"),
        RegistaObject {
            id: 2,
            object_type: ObjectType::Json as i32,
            timestamp: 0,
            data: Some(Data::Blob(b"{\"role\":\"regista\"}".to_vec())),
        },
        RegistaObject {
            id: 3,
            object_type: ObjectType::List as i32,
            timestamp: 0,
            data: Some(Data::List(ListValue {
                elements: vec![b"first".to_vec(), b"second".to_vec()],
            })),
        },
        RegistaObject {
            id: 4,
            object_type: ObjectType::Hash as i32,
            timestamp: 0,
            data: Some(Data::Hash(MapValue {
                fields: [("position".to_owned(), b"6".to_vec())].into_iter().collect(),
            })),
        },
        RegistaObject {
            id: 5,
            object_type: ObjectType::Vector as i32,
            timestamp: 0,
            data: Some(Data::Vector(VectorValue {
                elements: vec![0.1, -2.5, 3.0],
            })),
        },
    ];

    for object in objects {
        let id = object.id;
        let expected = object.data.clone();
        assert_eq!(client.store(object).await?, StatusToken::Ok, "id {id}");
        let fetched = client.fetch(id).await?;
        assert_eq!(fetched.and_then(|stored| stored.data), expected, "id {id}");
    }

    server.shutdown().await
}

#[tokio::test]
async fn test_server_allocates_zero_ids() -> Result<()> {
    let server = spawn_server(
        test_store_path("legacy_allocation"),
        WireFormat::Object,
        CreatePolicy::default(),
    )
    .await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;

    for expected in 1..=5 {
        let _token = client.store(string_object(0, "auto")).await?;
        let fetched = client.fetch(expected).await?;
        assert_eq!(fetched.map(|object| object.id), Some(expected));
    }

    server.shutdown().await
}

#[tokio::test]
async fn test_objects_survive_a_server_restart() -> Result<()> {
    let path = test_store_path("legacy_restart");
    let server = spawn_server(path.clone(), WireFormat::Object, CreatePolicy::default()).await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;
    let _token = client.store(string_object(7, "still here")).await?;
    drop(client);
    server.shutdown().await?;

    let server = spawn_server(path, WireFormat::Object, CreatePolicy::default()).await?;
    let mut client = LegacyClient::connect_to(server.ingest_addr, server.query_addr).await?;
    let fetched = client.fetch(7).await?;
    assert_eq!(
        fetched.and_then(|object| object.data),
        Some(Data::Blob(b"still here".to_vec()))
    );

    server.shutdown().await
}
