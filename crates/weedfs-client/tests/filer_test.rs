mod helpers;

use std::time::Duration;

use helpers::{client_for, config_for};
use mockito::Matcher;
use weedfs_client::{FilerClient, WeedClient};
use weedfs_core::WeedError;

fn filer_for(server: &mockito::ServerGuard) -> FilerClient {
    FilerClient::new(&server.url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn list_requests_json_with_trailing_slash() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", "/photos/")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body(r#"{"Path":"/photos","Entries":[{"FullPath":"/photos/a.jpg"}]}"#)
        .create_async()
        .await;

    let listing = filer_for(&server).list("/photos").await.unwrap();

    assert_eq!(listing["Entries"][0]["FullPath"], "/photos/a.jpg");
    list.assert_async().await;
}

#[tokio::test]
async fn put_posts_multipart_to_path() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/docs/notes.txt")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::Regex(r#"filename="notes.txt""#.into()))
        .with_status(201)
        .with_body(r#"{"name":"notes.txt","size":5}"#)
        .create_async()
        .await;

    let path = filer_for(&server)
        .put(b"notes".to_vec(), "/docs/notes.txt")
        .await
        .unwrap();

    assert_eq!(path, "/docs/notes.txt");
    upload.assert_async().await;
}

#[tokio::test]
async fn mkdir_writes_marker_file() {
    let mut server = mockito::Server::new_async().await;
    let marker = server
        .mock("POST", "/images/avatar/.info")
        .with_status(201)
        .create_async()
        .await;

    let path = filer_for(&server).mkdir("/images/avatar/").await.unwrap();

    assert_eq!(path, "/images/avatar/.info");
    marker.assert_async().await;
}

#[tokio::test]
async fn delete_reports_refusal_as_false() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("DELETE", "/docs/a.txt")
        .with_status(204)
        .create_async()
        .await;
    let _refused = server
        .mock("DELETE", "/docs/b.txt")
        .with_status(404)
        .create_async()
        .await;

    let filer = filer_for(&server);

    assert!(filer.delete("/docs/a.txt").await.unwrap());
    assert!(!filer.delete("/docs/b.txt").await.unwrap());
}

#[tokio::test]
async fn failed_put_is_filer_error() {
    let mut server = mockito::Server::new_async().await;
    let _upload = server
        .mock("POST", "/docs/x.txt")
        .with_status(500)
        .create_async()
        .await;

    let err = filer_for(&server)
        .put(b"x".to_vec(), "/docs/x.txt")
        .await
        .unwrap_err();

    assert!(matches!(err, WeedError::Filer(_)));
}

#[tokio::test]
async fn weed_client_hands_out_configured_filer() {
    let server = mockito::Server::new_async().await;

    assert!(matches!(client_for(&server).filer(), Err(WeedError::Config(_))));

    let config = config_for(&server).with_filer_url("filer.local:8888");
    let filer = WeedClient::new(config).unwrap().filer().unwrap();
    assert_eq!(filer.base_url(), "http://filer.local:8888");
}
