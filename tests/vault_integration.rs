//! Integration tests for the vault resource types using wiremock
//!
//! These tests run resource lifecycles against a mocked tenant, checking
//! the requests that reach it as well as the errors that come back.

use cfyvault::api::{HttpOptions, VaultClient};
use cfyvault::platform::path::resolve_folder_id;
use cfyvault::platform::secret::secret_type;
use cfyvault::platform::{
    Connector, Permission, PermissionCategory, Secret, SecretFolder, VaultResource,
};
use cfyvault::{ErrorKind, VaultError};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{bearer_token, body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY: &str = "/RedRock/query";

fn client(server: &MockServer) -> VaultClient {
    let options = HttpOptions {
        token: Some("test-token".to_string()),
        ..HttpOptions::default()
    };
    VaultClient::new(&server.uri(), &options).expect("client should build")
}

/// Successful envelope around a result
fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "Result": result,
        "Message": null,
        "MessageID": null,
        "Exception": null,
        "ErrorID": null,
        "ErrorCode": null,
        "IsSoftError": false,
        "InnerExceptions": null
    }))
}

/// Query envelope with the given rows
fn rows(rows: Vec<Value>) -> ResponseTemplate {
    let results: Vec<Value> = rows
        .into_iter()
        .map(|row| json!({"Entities": [], "Row": row}))
        .collect();
    ok(json!({"Count": results.len(), "Results": results}))
}

async fn mock_query(server: &MockServer, script: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(QUERY))
        .and(body_partial_json(json!({ "Script": script })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Scripts of every query the server received, in order
async fn received_scripts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|request| request.url.path() == QUERY)
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).expect("JSON body");
            body["Script"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

async fn mock_folder_chain(server: &MockServer) {
    mock_query(
        server,
        "SELECT * FROM Sets WHERE 1=1 AND ObjectType='Phantom' AND Name='folder1'",
        rows(vec![json!({"ID": "f1", "Name": "folder1"})]),
    )
    .await;
    mock_query(
        server,
        "SELECT * FROM Sets WHERE 1=1 AND ObjectType='Phantom' AND Name='folder2' AND Parent='f1'",
        rows(vec![json!({"ID": "f2", "Name": "folder2"})]),
    )
    .await;
    mock_query(
        server,
        "SELECT * FROM Sets WHERE 1=1 AND ObjectType='Phantom' AND Name='folder3' AND Parent='f2'",
        rows(vec![json!({"ID": "f3", "Name": "folder3"})]),
    )
    .await;
}

/// In-memory log sink for a scoped tracing subscriber
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

mod transport_tests {
    use super::*;

    /// Every call carries the native-client headers and the bearer token
    #[tokio::test]
    async fn test_calls_send_client_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/DeleteSecret"))
            .and(header("X-CENTRIFY-NATIVE-CLIENT", "Yes"))
            .and(header("X-CFY-SRC", "cfyvault"))
            .and(bearer_token("test-token"))
            .and(body_json(json!({"ID": "secret-1"})))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        let result = secret.delete().await.expect("delete should succeed");
        assert_eq!(result, json!(true));
    }

    #[tokio::test]
    async fn test_non_200_is_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/GetSecret"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        let err = secret.read().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, VaultError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_envelope_failure_carries_service_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/AddSecret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "Result": null,
                "Message": "Secret name already exists.",
                "Exception": "DuplicateKey"
            })))
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.secret_name = "Test secret".to_string();
        secret.secret_text = "s3cr3t".to_string();
        secret.secret_type = secret_type::TEXT.to_string();

        let err = secret.create().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Envelope);
        assert_eq!(err.to_string(), "Secret name already exists. DuplicateKey");
        assert!(secret.base.id.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_decode_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/GetSecret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        let err = secret.read().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(matches!(err, VaultError::MalformedEnvelope { .. }));
    }
}

mod lifecycle_tests {
    use super::*;

    /// Operations needing an identifier fail before any request is sent
    #[tokio::test]
    async fn test_empty_id_is_precondition_failure() {
        let server = MockServer::start().await;
        let mut secret = Secret::new(&client(&server));

        let read = secret.read().await.unwrap_err();
        let update = secret.update().await.unwrap_err();
        let delete = secret.delete().await.unwrap_err();

        for err in [read, update, delete] {
            assert_eq!(err.kind(), ErrorKind::Precondition);
            assert!(matches!(err, VaultError::MissingId("secret")));
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_mandatory_attribute_blocks_create() {
        let server = MockServer::start().await;
        let mut secret = Secret::new(&client(&server));
        secret.secret_name = "Test secret".to_string();

        let err = secret.create().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_cardinality() {
        let server = MockServer::start().await;
        let client = client(&server);

        mock_query(
            &server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='none' AND ParentPath=''",
            rows(vec![]),
        )
        .await;
        mock_query(
            &server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='dup' AND ParentPath=''",
            rows(vec![json!({"ID": "a"}), json!({"ID": "b"})]),
        )
        .await;
        mock_query(
            &server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='one' AND ParentPath=''",
            rows(vec![json!({"ID": "a", "SecretName": "one"})]),
        )
        .await;

        let mut secret = Secret::new(&client);

        secret.secret_name = "none".to_string();
        let err = secret.query().await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));

        secret.secret_name = "dup".to_string();
        let err = secret.query().await.unwrap_err();
        assert!(matches!(err, VaultError::TooMany(2)));
        assert_eq!(err.kind(), ErrorKind::Cardinality);

        secret.secret_name = "one".to_string();
        let row = secret.query().await.expect("single row");
        assert_eq!(row["ID"], "a");
    }

    /// Mount the read and delete endpoints so that reaching either fails
    async fn mock_untouchable_endpoints(server: &MockServer) {
        for endpoint in ["/ServerManage/GetSecret", "/ServerManage/DeleteSecret"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ok(json!(true)))
                .expect(0)
                .mount(server)
                .await;
        }
    }

    async fn mock_ambiguous_names(server: &MockServer) {
        mock_query(
            server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='none' AND ParentPath=''",
            rows(vec![]),
        )
        .await;
        mock_query(
            server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='dup' AND ParentPath=''",
            rows(vec![json!({"ID": "a"}), json!({"ID": "b"})]),
        )
        .await;
    }

    #[tokio::test]
    async fn test_get_by_name_requires_exactly_one_match() {
        let server = MockServer::start().await;
        mock_untouchable_endpoints(&server).await;
        mock_ambiguous_names(&server).await;

        let mut missing = Secret::new(&client(&server));
        missing.secret_name = "none".to_string();
        let err = missing.get_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
        assert!(missing.base.id.is_empty());

        let mut duplicated = Secret::new(&client(&server));
        duplicated.secret_name = "dup".to_string();
        let err = duplicated.get_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::TooMany(2)));
        assert!(duplicated.base.id.is_empty());
    }

    #[tokio::test]
    async fn test_get_id_by_name_requires_exactly_one_match() {
        let server = MockServer::start().await;
        mock_untouchable_endpoints(&server).await;
        mock_ambiguous_names(&server).await;

        let mut secret = Secret::new(&client(&server));

        secret.secret_name = "none".to_string();
        let err = secret.get_id_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
        assert_eq!(err.kind(), ErrorKind::Cardinality);

        secret.secret_name = "dup".to_string();
        let err = secret.get_id_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::TooMany(2)));
        assert!(secret.base.id.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_name_requires_exactly_one_match() {
        let server = MockServer::start().await;
        mock_untouchable_endpoints(&server).await;
        mock_ambiguous_names(&server).await;

        let mut missing = Secret::new(&client(&server));
        missing.secret_name = "none".to_string();
        let err = missing.delete_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));

        let mut duplicated = Secret::new(&client(&server));
        duplicated.secret_name = "dup".to_string();
        let err = duplicated.delete_by_name().await.unwrap_err();
        assert!(matches!(err, VaultError::TooMany(2)));

        let deletes = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.url.path() == "/ServerManage/DeleteSecret")
            .count();
        assert_eq!(deletes, 0);
    }

    /// Create under a path, fetch by name and path, delete by name, then the
    /// name no longer resolves
    #[tokio::test]
    async fn test_secret_end_to_end() {
        let server = MockServer::start().await;
        let client = client(&server);
        mock_folder_chain(&server).await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/AddSecret"))
            .and(body_partial_json(json!({
                "SecretName": "Test secret",
                "SecretText": "s3cr3t",
                "Type": "Text",
                "FolderId": "f2",
                "ParentPath": "folder1\\folder2",
                "updateChallenges": false
            })))
            .respond_with(ok(json!("secret-1")))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = "SELECT * FROM DataVault WHERE 1=1 AND SecretName='Test secret' AND ParentPath='folder1\\folder2'";
        Mock::given(method("POST"))
            .and(path(QUERY))
            .and(body_partial_json(json!({ "Script": lookup })))
            .respond_with(rows(vec![json!({"ID": "secret-1", "SecretName": "Test secret"})]))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(QUERY))
            .and(body_partial_json(json!({ "Script": lookup })))
            .respond_with(rows(vec![]))
            .with_priority(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/GetSecret"))
            .and(body_json(json!({"ID": "secret-1"})))
            .respond_with(ok(json!({
                "_RowKey": "secret-1",
                "ID": "secret-1",
                "SecretName": "Test secret",
                "Type": "Text",
                "FolderId": "f2",
                "ParentPath": "folder1\\folder2",
                "Description": "created by test",
                "WhenCreated": "/Date(1582558666855)/"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ServerManage/GetSecretRightsAndChallenges"))
            .respond_with(ok(json!({
                "Challenges": {
                    "DataVaultDefaultProfile": "profile-1",
                    "DataVaultRules": {
                        "Enabled": true,
                        "_UniqueKey": "Condition",
                        "_Type": "RowSet",
                        "_Value": []
                    }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ServerManage/DeleteSecret"))
            .and(body_json(json!({"ID": "secret-1"})))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let mut created = Secret::new(&client);
        created.secret_name = "Test secret".to_string();
        created.secret_text = "s3cr3t".to_string();
        created.secret_type = secret_type::TEXT.to_string();
        created.parent_path = "folder1\\folder2".to_string();
        let id = created.create().await.expect("create should succeed");
        assert_eq!(id, "secret-1");
        assert_eq!(created.base.id, "secret-1");
        assert_eq!(created.folder_id, "f2");

        let mut fetched = Secret::new(&client);
        fetched.secret_name = "Test secret".to_string();
        fetched.parent_path = "folder1\\folder2".to_string();
        fetched.get_by_name().await.expect("fetch should succeed");
        assert_eq!(fetched.base.id, id);
        assert_eq!(fetched.base.description, "created by test");
        assert_eq!(fetched.default_profile_id, "profile-1");
        assert!(fetched.challenge_rules.as_ref().is_some_and(|r| r.enabled));

        let mut doomed = Secret::new(&client);
        doomed.secret_name = "Test secret".to_string();
        doomed.parent_path = "folder1\\folder2".to_string();
        doomed.delete_by_name().await.expect("delete should succeed");

        let err = doomed.query().await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
    }

    #[tokio::test]
    async fn test_update_with_redirect_recomputes_folder() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/UpdateSecret"))
            .and(body_partial_json(json!({
                "ID": "secret-1",
                "FolderId": "f3",
                "ParentPath": "folder1\\folder2\\folder3",
                "updateChallenges": true
            })))
            .respond_with(ok(json!({"ID": "secret-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        secret.secret_name = "Test secret".to_string();
        secret.folder_id = "stale".to_string();
        secret.parent_path = "folder1".to_string();
        secret.new_parent_path = "folder1\\folder2\\folder3".to_string();

        secret.update().await.expect("update should succeed");
        assert_eq!(secret.folder_id, "f3");
    }

    #[tokio::test]
    async fn test_checkout_looks_up_and_binds_folder() {
        let server = MockServer::start().await;

        mock_query(
            &server,
            "SELECT * FROM DataVault WHERE 1=1 AND SecretName='api key' AND ParentPath=''",
            rows(vec![json!({"ID": "secret-9", "FolderId": "root-folder"})]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/ServerManage/RetrieveSecretContents"))
            .and(body_partial_json(json!({"ID": "secret-9"})))
            .respond_with(ok(json!({"SecretName": "api key", "SecretText": "abc123"})))
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.secret_name = "api key".to_string();

        let text = secret.checkout_secret().await.expect("checkout should succeed");
        assert_eq!(text, "abc123");
        assert_eq!(secret.base.id, "secret-9");
        assert_eq!(secret.folder_id, "root-folder");
    }

    /// Secret content must not reach the log, even at trace level
    #[tokio::test]
    async fn test_checkout_never_logs_secret_text() {
        let server = MockServer::start().await;
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        Mock::given(method("POST"))
            .and(path("/ServerManage/RetrieveSecretContents"))
            .and(body_partial_json(json!({"ID": "secret-9"})))
            .respond_with(ok(json!({"SecretText": "TOPSECRET-hunter2"})))
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-9".to_string();
        let text = secret.checkout_secret().await.expect("checkout should succeed");
        assert_eq!(text, "TOPSECRET-hunter2");

        let log = logs.contents();
        assert!(log.contains("Response from /ServerManage/RetrieveSecretContents"));
        assert!(!log.contains("TOPSECRET-hunter2"), "secret leaked into log: {}", log);
    }

    #[tokio::test]
    async fn test_move_secret_sends_target_folder() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/MoveSecret"))
            .and(body_json(json!({"ID": "secret-1", "targetFolderId": "f1"})))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        secret.new_parent_path = "folder1".to_string();
        assert!(secret.move_secret().await.expect("move should succeed"));
    }

    #[tokio::test]
    async fn test_connector_reads_through_query_table() {
        let server = MockServer::start().await;

        mock_query(
            &server,
            "SELECT * FROM Proxy WHERE 1=1 AND ID='c-1'",
            rows(vec![json!({
                "ID": "c-1",
                "Name": "conn01",
                "MachineName": "CONN01",
                "Online": true,
                "Version": "21.3.100"
            })]),
        )
        .await;

        let mut connector = Connector::new(&client(&server));
        connector.base.id = "c-1".to_string();
        connector.read().await.expect("read should succeed");

        assert_eq!(connector.base.name, "conn01");
        assert_eq!(connector.machine_name, "CONN01");
        assert!(connector.online);
    }

    #[tokio::test]
    async fn test_type_mismatch_in_row_is_decode_failure() {
        let server = MockServer::start().await;

        mock_query(
            &server,
            "SELECT * FROM Proxy WHERE 1=1 AND ID='c-1'",
            rows(vec![json!({"ID": "c-1", "Online": "yes"})]),
        )
        .await;

        let mut connector = Connector::new(&client(&server));
        connector.base.id = "c-1".to_string();
        let err = connector.read().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("Online"));
    }
}

mod path_tests {
    use super::*;

    #[tokio::test]
    async fn test_nested_path_resolves_outermost_first() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;

        let id = resolve_folder_id(&client(&server), "folder1\\folder2\\folder3")
            .await
            .expect("path should resolve");
        assert_eq!(id.as_deref(), Some("f3"));

        let scripts = received_scripts(&server).await;
        assert_eq!(scripts.len(), 3);
        assert!(scripts[0].ends_with("Name='folder1'"));
        assert!(scripts[1].ends_with("Name='folder2' AND Parent='f1'"));
        assert!(scripts[2].ends_with("Name='folder3' AND Parent='f2'"));
    }

    #[tokio::test]
    async fn test_missing_level_propagates_not_found() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;
        mock_query(
            &server,
            "SELECT * FROM Sets WHERE 1=1 AND ObjectType='Phantom' AND Name='missing' AND Parent='f1'",
            rows(vec![]),
        )
        .await;

        let err = resolve_folder_id(&client(&server), "folder1\\missing\\folder3")
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
        // The innermost level is never looked up
        assert_eq!(received_scripts(&server).await.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_lookup_by_path() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;

        let mut folder = SecretFolder::with_path(&client(&server), "folder1\\folder2\\folder3");
        let id = folder.get_id_by_name().await.expect("lookup should succeed");

        assert_eq!(id, "f3");
        assert_eq!(folder.parent_id, "f2");
    }

    #[tokio::test]
    async fn test_folder_create_resolves_parent() {
        let server = MockServer::start().await;
        mock_folder_chain(&server).await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/AddSecretsFolder"))
            .and(body_partial_json(json!({
                "Name": "folder4",
                "Parent": "f3",
                "ParentPath": "folder1\\folder2\\folder3"
            })))
            .respond_with(ok(json!("f4")))
            .expect(1)
            .mount(&server)
            .await;

        let mut folder =
            SecretFolder::with_path(&client(&server), "folder1\\folder2\\folder3\\folder4");
        assert_eq!(folder.create().await.expect("create should succeed"), "f4");
    }
}

mod permission_tests {
    use super::*;

    async fn mock_principals(server: &MockServer) {
        mock_query(
            server,
            "SELECT * FROM Role WHERE 1=1 AND Name='System Administrator'",
            rows(vec![json!({"ID": "role-1", "Name": "System Administrator"})]),
        )
        .await;
        mock_query(
            server,
            "SELECT * FROM User WHERE 1=1 AND Username='admin@example.com'",
            rows(vec![json!({"ID": "user-1", "Username": "admin@example.com"})]),
        )
        .await;
    }

    #[tokio::test]
    async fn test_lowercase_role_resolves_like_role() {
        let server = MockServer::start().await;
        mock_principals(&server).await;

        let mut secret = Secret::new(&client(&server));
        let perms = vec![
            Permission::new("System Administrator", "role")
                .with_rights(&["View", "RetrieveSecret"]),
            Permission::new("admin@example.com", "User").with_rights_str("Grant, Edit"),
        ];
        secret.resolve_permissions(perms).await.expect("should resolve");

        let resolved = &secret.base.permissions;
        assert_eq!(resolved[0].principal_id, "role-1");
        assert_eq!(resolved[0].principal_type, "Role");
        assert_eq!(resolved[0].rights, "View,Retrieve");
        assert_eq!(resolved[1].principal_id, "user-1");
        assert_eq!(resolved[1].rights, "Grant,Edit");
    }

    #[tokio::test]
    async fn test_invalid_principal_type_aborts_batch() {
        let server = MockServer::start().await;
        mock_principals(&server).await;

        let client = client(&server);
        let mut perms = vec![
            Permission::new("admin@example.com", "User").with_rights(&["View"]),
            Permission::new("Engineering", "Group").with_rights(&["View"]),
        ];
        let before = perms.clone();

        let err = cfyvault::platform::permission::resolve_permissions(
            &client,
            &mut perms,
            PermissionCategory::Secret.table(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VaultError::InvalidPrincipalType(ref t) if t == "Group"));
        assert_eq!(perms, before);
        assert!(perms[0].principal_id.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_right_names_offender() {
        let server = MockServer::start().await;
        mock_principals(&server).await;

        let mut role_perm = Permission::new("System Administrator", "Role").with_rights(&["Run"]);
        let mut secret = Secret::new(&client(&server));
        let err = secret
            .resolve_permissions(vec![role_perm.clone()])
            .await
            .unwrap_err();

        assert!(matches!(err, VaultError::InvalidRight(ref r) if r == "Run"));
        assert!(secret.base.permissions.is_empty());

        // Account tables translate Grant differently
        role_perm = role_perm.with_rights(&["Grant"]);
        let mut perms = vec![role_perm];
        cfyvault::platform::permission::resolve_permissions(
            &client(&server),
            &mut perms,
            PermissionCategory::Account.table(),
        )
        .await
        .expect("should resolve");
        assert_eq!(perms[0].rights, "Owner");
    }

    #[tokio::test]
    async fn test_set_permissions_posts_grants() {
        let server = MockServer::start().await;
        mock_principals(&server).await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/SetSecretPermissions"))
            .and(body_json(json!({
                "ID": "secret-1",
                "PVID": "secret-1",
                "RowKey": "secret-1",
                "Grants": [{
                    "PrincipalId": "role-1",
                    "Principal": "System Administrator",
                    "PType": "Role",
                    "Rights": "View,Edit"
                }]
            })))
            .respond_with(ok(json!(null)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ServerManage/SetSecretPermissions"))
            .and(body_partial_json(json!({"Grants": [{"Rights": "None"}]})))
            .respond_with(ok(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        secret
            .resolve_permissions(vec![
                Permission::new("System Administrator", "Role").with_rights(&["View", "Edit"])
            ])
            .await
            .expect("should resolve");

        secret.set_permissions(false).await.expect("grant should succeed");
        secret.set_permissions(true).await.expect("revoke should succeed");
    }

    #[tokio::test]
    async fn test_add_to_sets_by_name() {
        let server = MockServer::start().await;

        mock_query(
            &server,
            "SELECT * FROM Sets WHERE 1=1 AND CollectionType='ManualBucket' AND Name='Prod secrets' AND ObjectType='DataVault'",
            rows(vec![json!({"ID": "set-1"})]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/Collection/UpdateMembersCollection"))
            .and(body_json(json!({
                "id": "set-1",
                "add": [{"MemberType": "Row", "Table": "DataVault", "Key": "secret-1"}]
            })))
            .respond_with(ok(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let mut secret = Secret::new(&client(&server));
        secret.base.id = "secret-1".to_string();
        secret
            .add_to_sets_by_name(&["Prod secrets"])
            .await
            .expect("membership should be added");
    }
}

mod workflow_tests {
    use super::*;
    use cfyvault::platform::workflow::{workflow_type, BackupApprover, WorkflowApprover};
    use cfyvault::platform::GlobalWorkflow;

    /// Update resolves user and role approvers, then sends the whole chain
    #[tokio::test]
    async fn test_update_resolves_approvers() {
        let server = MockServer::start().await;
        mock_query(
            &server,
            "SELECT * FROM Role WHERE 1=1 AND Name='System Administrator'",
            rows(vec![json!({"ID": "role-1", "Name": "System Administrator"})]),
        )
        .await;
        mock_query(
            &server,
            "SELECT * FROM User WHERE 1=1 AND Username='labadmin@demo.lab'",
            rows(vec![json!({"ID": "user-1", "Username": "labadmin@demo.lab"})]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/UpdateGlobalWorkflow"))
            .and(body_json(json!({
                "Type": "wf",
                "Settings": {
                    "WorkflowEnabled": true,
                    "WorkflowApprover": [
                        {
                            "Type": "Manager",
                            "OptionsSelector": true,
                            "NoManagerAction": "useBackup",
                            "BackupApprover": {
                                "Guid": "user-1",
                                "Name": "labadmin@demo.lab",
                                "Type": "User",
                                "DirectoryService": "AdProxy",
                                "DirectoryName": "demo.lab"
                            }
                        },
                        {"Guid": "role-1", "Name": "System Administrator", "Type": "Role"}
                    ]
                }
            })))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let mut workflow = GlobalWorkflow::new(&client(&server), workflow_type::ACCOUNT);
        workflow.settings.enabled = true;
        workflow.settings.approvers = vec![
            WorkflowApprover::manager(Some(BackupApprover {
                name: "labadmin@demo.lab".to_string(),
                approver_type: "User".to_string(),
                directory_service: "AdProxy".to_string(),
                directory_name: "demo.lab".to_string(),
                ..Default::default()
            })),
            WorkflowApprover::principal("System Administrator", "Role"),
        ];

        workflow.update().await.expect("update should succeed");
        assert_eq!(workflow.settings.approvers[1].guid, "role-1");
    }

    /// Delete goes to the update endpoint with the workflow switched off
    #[tokio::test]
    async fn test_delete_disables_workflow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ServerManage/GetGlobalWorkflow"))
            .and(body_json(json!({"Type": "secretsWorkflow"})))
            .respond_with(ok(json!({
                "Type": "secretsWorkflow",
                "Settings": {
                    "WorkflowEnabled": true,
                    "WorkflowApprover": [{"Guid": "role-1", "Name": "Approvers", "Type": "Role"}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ServerManage/UpdateGlobalWorkflow"))
            .and(body_json(json!({
                "Type": "secretsWorkflow",
                "Settings": {
                    "WorkflowEnabled": false,
                    "WorkflowApprover": [{"Guid": "role-1", "Name": "Approvers", "Type": "Role"}]
                }
            })))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let mut workflow = GlobalWorkflow::new(&client(&server), workflow_type::SECRETS);
        workflow.read().await.expect("read should succeed");
        assert!(workflow.settings.enabled);

        workflow.delete().await.expect("delete should succeed");
        assert_eq!(received_scripts(&server).await.len(), 0);
    }

    #[tokio::test]
    async fn test_name_lookup_is_unsupported() {
        let server = MockServer::start().await;
        let mut workflow = GlobalWorkflow::new(&client(&server), workflow_type::ACCOUNT);
        workflow.base.name = "wf".to_string();

        let err = workflow.get_by_name().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
