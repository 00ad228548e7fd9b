use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yamirror_core::{ApiErrorClass, ClientTimeouts, ResourceType, YadiskClient};

#[tokio::test]
async fn get_resource_encodes_path_and_sends_oauth_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup/Hello World.txt"))
        .and(header("authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "disk:/Backup/Hello World.txt",
            "name": "Hello World.txt",
            "type": "file",
            "size": 12,
            "modified": "2024-01-01T00:00:00+00:00"
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let resource = client
        .get_resource("/Backup/Hello World.txt")
        .await
        .unwrap();

    assert_eq!(resource.resource_type, ResourceType::File);
    assert_eq!(resource.size, Some(12));
    assert_eq!(
        resource.modified.as_deref(),
        Some("2024-01-01T00:00:00+00:00")
    );
}

#[tokio::test]
async fn get_resource_reports_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Не удалось найти запрошенный ресурс.",
            "error": "DiskNotFoundError"
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client.get_resource("/Missing").await.unwrap_err();

    assert_eq!(err.classification(), Some(ApiErrorClass::NotFound));
    assert_eq!(
        err.api_message().as_deref(),
        Some("Не удалось найти запрошенный ресурс.")
    );
}

#[tokio::test]
async fn get_upload_link_sends_overwrite_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .and(query_param("path", "/Backup/report.txt"))
        .and(query_param("overwrite", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": "https://upload.example/report.txt",
            "method": "PUT",
            "templated": false
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let link = client
        .get_upload_link("/Backup/report.txt", true)
        .await
        .unwrap();

    assert_eq!(link.href.as_str(), "https://upload.example/report.txt");
    assert_eq!(link.method, "PUT");
}

#[tokio::test]
async fn get_upload_link_conflict_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .and(query_param("overwrite", "false"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Resource already exists",
            "error": "DiskResourceAlreadyExistsError"
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client
        .get_upload_link("/Backup/report.txt", false)
        .await
        .unwrap_err();

    assert_eq!(err.classification(), Some(ApiErrorClass::Conflict));
    assert_eq!(err.api_message().as_deref(), Some("Resource already exists"));
}

#[tokio::test]
async fn list_directory_returns_embedded_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {
                "limit": 2,
                "offset": 0,
                "total": 2,
                "items": [
                    {
                        "path": "disk:/Backup/A.txt",
                        "name": "A.txt",
                        "type": "file",
                        "size": 1,
                        "modified": "2024-01-01T00:00:00+00:00"
                    },
                    {
                        "path": "disk:/Backup/B",
                        "name": "B",
                        "type": "dir"
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let list = client
        .list_directory("/Backup", Some(2), Some(0))
        .await
        .unwrap();

    assert_eq!(list.total, 2);
    assert_eq!(list.items.len(), 2);
    assert_eq!(list.items[0].name, "A.txt");
    assert_eq!(list.items[1].resource_type, ResourceType::Dir);
}

#[tokio::test]
async fn list_directory_all_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {
                "limit": 1,
                "offset": 0,
                "total": 2,
                "items": [
                    { "path": "disk:/Backup/A.txt", "name": "A.txt", "type": "file" }
                ]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {
                "limit": 1,
                "offset": 1,
                "total": 2,
                "items": [
                    { "path": "disk:/Backup/B.txt", "name": "B.txt", "type": "file" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let items = client.list_directory_all("/Backup", 1).await.unwrap();

    let names: Vec<_> = items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["A.txt", "B.txt"]);
}

#[tokio::test]
async fn list_directory_without_embedded_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "disk:/Backup/A.txt",
            "name": "A.txt",
            "type": "file"
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client
        .list_directory("/Backup/A.txt", None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, yamirror_core::YadiskError::MissingEmbedded));
}

#[tokio::test]
async fn create_folder_uses_put() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup/img"))
        .and(header("authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "href": "https://cloud-api.yandex.net/v1/disk/resources?path=disk%3A%2FBackup%2Fimg",
            "method": "GET",
            "templated": false
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    client.create_folder("/Backup/img").await.unwrap();
}

#[tokio::test]
async fn create_folder_unauthorized_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Не авторизован.",
            "error": "UnauthorizedError"
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "bad-token").unwrap();
    let err = client.create_folder("/Backup").await.unwrap_err();

    assert_eq!(err.classification(), Some(ApiErrorClass::Auth));
}

#[tokio::test]
async fn delete_resource_returns_none_on_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup/old.txt"))
        .and(query_param("force_async", "false"))
        .and(header("authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let response = client
        .delete_resource("/Backup/old.txt", false)
        .await
        .unwrap();

    assert!(response.is_none());
}

#[tokio::test]
async fn delete_resource_accepted_returns_operation_link() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Backup/old.txt"))
        .and(query_param("permanently", "true"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "href": "https://cloud-api.yandex.net/v1/disk/operations/3",
            "method": "GET",
            "templated": false
        })))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let response = client
        .delete_resource("/Backup/old.txt", true)
        .await
        .unwrap();

    let link = response.expect("expected operation link");
    assert_eq!(
        link.href.as_str(),
        "https://cloud-api.yandex.net/v1/disk/operations/3"
    );
}

#[tokio::test]
async fn delete_resource_rejects_plain_ok() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client
        .delete_resource("/Backup/old.txt", false)
        .await
        .unwrap_err();

    assert_eq!(err.classification(), Some(ApiErrorClass::Rejected));
}

#[tokio::test]
async fn slow_response_is_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "path": "/", "name": "", "type": "dir" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = YadiskClient::with_timeouts(
        &server.uri(),
        "test-token",
        ClientTimeouts {
            request: Duration::from_millis(200),
            connect: Duration::from_millis(200),
        },
    )
    .unwrap();
    let err = client.get_resource("/Backup").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.classification(), None);
}
