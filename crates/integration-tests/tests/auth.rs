// Token validation, password login and the insecure-http guard

mod common;

use common::{TestEnv, ALICE_PASSWORD, ALICE_TOKEN};
use handle_service_sdk::{CallerConfig, ClientError, Credentials, HandleServiceClient};

#[tokio::test]
async fn test_login_with_password_yields_a_working_client() {
    let env = TestEnv::start().await;

    let client = HandleServiceClient::connect(
        env.service_url(),
        Credentials::Password {
            user: "alice".to_string(),
            password: ALICE_PASSWORD.to_string(),
        },
        env.config(),
    )
    .await
    .unwrap();

    let token = client.token().unwrap();
    assert_eq!(token.user_name(), "alice");
    assert_eq!(token.token(), ALICE_TOKEN);
    assert!(!format!("{:?}", token).contains(ALICE_TOKEN));

    assert_eq!(client.is_owner(&[], None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let env = TestEnv::start().await;

    let result = HandleServiceClient::with_credentials_and_auth_url(
        env.service_url(),
        "alice",
        "wrong",
        env.auth_url(),
    )
    .await;

    match result {
        Err(ClientError::Unauthorized(message)) => {
            assert!(message.contains("Authentication failed"))
        }
        Err(other) => panic!("unexpected {:?}", other),
        Ok(_) => panic!("login should have failed"),
    }
}

#[tokio::test]
async fn test_token_is_resolved_to_its_user() {
    let env = TestEnv::start().await;

    let client =
        HandleServiceClient::with_token_and_auth_url(env.service_url(), ALICE_TOKEN, env.auth_url())
            .await
            .unwrap();

    assert_eq!(client.token().unwrap().user_name(), "alice");
}

#[tokio::test]
async fn test_invalid_token_is_rejected_at_construction() {
    let env = TestEnv::start().await;

    let result =
        HandleServiceClient::with_token_and_auth_url(env.service_url(), "stale", env.auth_url())
            .await;

    assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    assert!(env.service_requests().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_auth_service_is_an_io_error() {
    let env = TestEnv::start().await;

    // Bind and release a port so nothing is listening there
    let dead = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_url = format!("http://{}/services/auth", dead.local_addr().unwrap());
    drop(dead);

    let config = CallerConfig {
        auth_url: dead_url,
        ..env.config()
    };
    let result = HandleServiceClient::connect(
        env.service_url(),
        Credentials::Token(ALICE_TOKEN.to_string()),
        config,
    )
    .await;

    match result {
        Err(err) => assert!(err.is_io(), "expected I/O error, got {:?}", err),
        Ok(_) => panic!("auth service should be unreachable"),
    }
}

#[tokio::test]
async fn test_token_stays_off_plain_http_unless_allowed() {
    let env = TestEnv::start().await;
    let mut client = env.client_with_token(ALICE_TOKEN).await;
    client.set_insecure_http_connection_allowed(false);

    let err = client
        .hids_to_handles(&["KBH_1".to_string()], None)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    // status goes out anonymously instead
    client.status(None).await.unwrap();
    let received = env.server.received_requests().await.unwrap();
    let status_request = received
        .iter()
        .find(|r| r.url.path() == common::SERVICE_PATH)
        .unwrap();
    assert!(status_request.headers.get("authorization").is_none());

    client.set_insecure_http_connection_allowed(true);
    assert!(client
        .hids_to_handles(&["KBH_1".to_string()], None)
        .await
        .unwrap()
        .is_empty());
}
