mod common;

use ajo_piggybank::U256;
use axum::http::StatusCode;
use common::{owner, user, TestEnvironment, NOW, UNLOCK};
use serde_json::json;

#[tokio::test]
async fn test_connect_rejects_malformed_address() {
    let env = TestEnvironment::new();

    let (status, body) = env
        .request(
            "POST",
            "/api/session/connect",
            Some(json!({ "address": "0x1234" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("address"));
    assert!(env.manager.session().is_none());
}

#[tokio::test]
async fn test_connect_owner_and_disconnect() {
    let env = TestEnvironment::new();

    let (status, body) = env.connect(owner()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_owner"], true);

    let (status, body) = env.request("POST", "/api/session/disconnect", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["address"].is_null());
    assert_eq!(body["is_owner"], false);
}

#[tokio::test]
async fn test_deposit_rejects_invalid_amounts() {
    let env = TestEnvironment::new();
    env.connect(user()).await;

    for amount in ["", "0", "-1", "abc", "1000"] {
        let (status, _) = env
            .request("POST", "/api/deposit", Some(json!({ "amount": amount })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {:?}", amount);
    }
    assert!(env.chain.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_deposit_requires_connected_account() {
    let env = TestEnvironment::new();

    let (status, _) = env
        .request("POST", "/api/deposit", Some(json!({ "amount": "0.5" })))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(env.chain.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_deposit_is_submitted_and_tracked() {
    let env = TestEnvironment::new();
    env.connect(user()).await;

    let (status, body) = env
        .request("POST", "/api/deposit", Some(json!({ "amount": "0.5" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"], "deposit");
    assert!(body["tx_hash"].is_string());

    let sent = env.chain.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, user());
    assert_eq!(sent[0].value, U256::from(500_000_000_000_000_000u64));

    let (status, body) = env.request("GET", "/api/transactions/submitted", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_withdraw_while_locked_is_conflict() {
    let env = TestEnvironment::new();
    env.chain
        .set_balance(user(), U256::from(1_000_000_000_000_000_000u64));
    env.connect(user()).await;

    let (status, body) = env.request("POST", "/api/withdraw", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("locked"));

    let (status, _) = env.request("POST", "/api/withdraw-all", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(env.chain.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_withdraw_after_unlock_is_submitted() {
    let env = TestEnvironment::new();
    env.chain
        .set_balance(user(), U256::from(1_000_000_000_000_000_000u64));
    env.chain.set_block_timestamp(UNLOCK + 1);
    env.clock.set(UNLOCK as i64 + 1);
    env.connect(user()).await;

    let (status, body) = env.request("POST", "/api/withdraw", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"], "withdraw");
    assert_eq!(env.chain.sent_transactions().len(), 1);
}

#[tokio::test]
async fn test_admin_stats_only_for_owner() {
    let env = TestEnvironment::new();

    env.connect(user()).await;
    let (status, _) = env.request("GET", "/api/admin/stats", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    env.connect(owner()).await;
    let (status, body) = env.request("GET", "/api/admin/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emergency_mode"], false);
    assert!(body.get("total_deposits").is_some());
}

#[tokio::test]
async fn test_dashboard_snapshot_panels() {
    let env = TestEnvironment::new();
    env.chain
        .set_balance(user(), U256::from(2_000_000_000_000_000_000u64));
    env.connect(user()).await;

    let (status, body) = env.request("GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["network"]["network_type"], "testnet");
    assert_eq!(body["balance"]["status"], "ready");
    assert_eq!(body["balance"]["value"]["balance"], "2");
    assert_eq!(body["balance"]["value"]["unlock_time"], UNLOCK);
    assert_eq!(body["bookmarks"]["status"], "ready");
    // Not the owner, so no admin panel at all.
    assert!(body["admin"].is_null());

    env.connect(owner()).await;
    let (_, body) = env.request("GET", "/api/dashboard", None).await;
    assert_eq!(body["admin"]["status"], "ready");
}

#[tokio::test]
async fn test_failed_read_is_contained_in_balance_panel() {
    let env = TestEnvironment::new();
    env.chain.set_fail_reads(true);
    env.connect(user()).await;

    let (status, body) = env.request("GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"]["status"], "failed");
    assert_eq!(body["balance"]["fallback"]["boundary"], "balance");
    assert_eq!(body["balance"]["fallback"]["recovery"], "retry");
    assert_eq!(body["bookmarks"]["status"], "ready");
}

#[tokio::test]
async fn test_bookmarks_lifecycle() {
    let env = TestEnvironment::new();

    let (status, body) = env
        .request(
            "POST",
            "/api/bookmarks",
            Some(json!({
                "name": "  Rent  ",
                "amount": "1.5",
                "unlock_time": NOW + 86_400,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["name"], "Rent");

    let (_, body) = env.request("GET", "/api/bookmarks", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/api/bookmarks/{}", id);
    let (status, body) = env.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (status, _) = env.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = env.request("GET", "/api/bookmarks", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dismiss_unknown_toast_is_not_found() {
    let env = TestEnvironment::new();

    let (status, _) = env.request("DELETE", "/api/toasts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_diagnostics_report_and_clear() {
    let env = TestEnvironment::new();

    let (status, body) = env.request("GET", "/api/diagnostics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain_connection"]["is_connected"], true);
    assert_eq!(body["chain_connection"]["chain_id"], 84532);
    assert_eq!(body["contract"]["is_deployed"], true);
    assert_eq!(body["environment"]["project_id"], "configured");

    let (status, body) = env.request("DELETE", "/api/diagnostics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cleared");
}

#[tokio::test]
async fn test_missing_contract_address_is_reported() {
    let env = TestEnvironment::with_contract(None);

    let (status, body) = env.request("GET", "/api/timelock", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Contract address not configured"));

    let (status, body) = env.request("GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"]["status"], "failed");
    assert_eq!(body["bookmarks"]["status"], "ready");

    let (_, body) = env.request("GET", "/api/diagnostics", None).await;
    assert_eq!(body["contract"]["error"], "Contract address not configured");
}
