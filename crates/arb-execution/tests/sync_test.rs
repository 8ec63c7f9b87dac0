//! 포지션 동기화 작업 통합 테스트.

use std::sync::Arc;

use mockito::ServerGuard;
use rust_decimal_macros::dec;

use arb_core::{InMemoryPositionStore, Position, PositionSide, PositionStore};
use arb_exchange::{AllowAll, OkxConfig, OkxCredentials, OkxRestClient};
use arb_execution::PositionSyncJob;

fn job_against(server: &ServerGuard) -> (PositionSyncJob, Arc<InMemoryPositionStore>) {
    let config = OkxConfig::new(OkxCredentials::new("test-key", "test-secret", "test-pass"), false)
        .with_base_url(server.url());
    let client = Arc::new(OkxRestClient::new(config, Arc::new(AllowAll)));
    let store = Arc::new(InMemoryPositionStore::new());
    let job = PositionSyncJob::new(client, Arc::clone(&store) as Arc<dyn PositionStore>);
    (job, store)
}

fn open_position(symbol: &str, id: &str) -> Position {
    Position::open_from_fill(
        Some(id.to_string()),
        None,
        symbol,
        PositionSide::Long,
        dec!(10),
        dec!(100),
        dec!(5),
        dec!(200),
        dec!(0.25),
        "ord-1",
    )
}

const SNAPSHOT_BODY: &str = r#"{"code":"0","msg":"","data":[
    {"instId":"BTC-USDT-SWAP","posId":"777","pos":"-12","markPx":"105","upl":"7.5",
     "uplRatio":"0.03","realizedPnl":"0.2","avgPx":"101","fee":"-0.3","fundingFee":"-0.02",
     "margin":"55","uTime":"1"},
    {"instId":"SOL-USDT-SWAP","posId":"999","pos":"3","markPx":"20","upl":"1",
     "uplRatio":"0.01","realizedPnl":"0","avgPx":"19","fee":"-0.1","fundingFee":"0",
     "margin":"10","uTime":"2"}
]}"#;

#[tokio::test]
async fn sync_overwrites_mutable_fields_of_matching_open_position() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v5/account/positions")
        .with_body(SNAPSHOT_BODY)
        .create_async()
        .await;

    let (job, store) = job_against(&server);
    store
        .save(open_position("BTC-USDT-SWAP", "777"))
        .await
        .unwrap();

    let updated = job.sync_all().await;
    assert_eq!(updated, 1);

    let position = store.find("777").await.unwrap().unwrap();
    assert_eq!(position.current_price, dec!(105));
    assert_eq!(position.unrealized_pnl, dec!(7.5));
    assert_eq!(position.unrealized_pnl_percent, dec!(3.00)); // 0.03 × 100
    assert_eq!(position.realized_pnl, dec!(0.2));
    assert_eq!(position.entry_price, dec!(101));
    assert_eq!(position.size, dec!(12)); // 절댓값
    assert_eq!(position.opening_fees, dec!(0.3));
    assert_eq!(position.funding_fees, dec!(0.02));
    assert_eq!(position.allocated_amount, dec!(55));
    assert!(position.is_open());
}

#[tokio::test]
async fn sync_never_adopts_unknown_exchange_positions() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v5/account/positions")
        .with_body(SNAPSHOT_BODY)
        .create_async()
        .await;

    let (job, store) = job_against(&server);
    store
        .save(open_position("BTC-USDT-SWAP", "777"))
        .await
        .unwrap();

    job.sync_all().await;

    // SOL 포지션은 로컬 레코드가 없으므로 편입되지 않음
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn sync_leaves_local_position_untouched_when_absent_from_snapshot() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v5/account/positions")
        .with_body(SNAPSHOT_BODY)
        .create_async()
        .await;

    let (job, store) = job_against(&server);
    store
        .save(open_position("ETH-USDT-SWAP", "888"))
        .await
        .unwrap();

    let updated = job.sync_all().await;
    assert_eq!(updated, 0);

    // 스냅샷에 없다고 자동 청산되지 않음 — 청산은 명시적 close 전이로만
    let position = store.find("888").await.unwrap().unwrap();
    assert!(position.is_open());
    assert_eq!(position.current_price, dec!(100));
}

#[tokio::test]
async fn sync_symbols_filters_snapshot() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v5/account/positions")
        .with_body(
            r#"{"code":"0","msg":"","data":[
                {"instId":"BTC-USDT-SWAP","posId":"777","pos":"10","markPx":"105","uTime":"1"},
                {"instId":"ETH-USDT-SWAP","posId":"888","pos":"5","markPx":"3100","uTime":"2"}
            ]}"#,
        )
        .create_async()
        .await;

    let (job, store) = job_against(&server);
    store
        .save(open_position("BTC-USDT-SWAP", "777"))
        .await
        .unwrap();
    store
        .save(open_position("ETH-USDT-SWAP", "888"))
        .await
        .unwrap();

    let updated = job
        .sync_symbols(&["ETH-USDT-SWAP".to_string()])
        .await;
    assert_eq!(updated, 1);

    // 필터에 없는 BTC는 그대로
    let btc = store.find("777").await.unwrap().unwrap();
    assert_eq!(btc.current_price, dec!(100));
    let eth = store.find("888").await.unwrap().unwrap();
    assert_eq!(eth.current_price, dec!(3100));
}

#[tokio::test]
async fn sync_survives_snapshot_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v5/account/positions")
        .with_status(500)
        .create_async()
        .await;

    let (job, store) = job_against(&server);
    store
        .save(open_position("BTC-USDT-SWAP", "777"))
        .await
        .unwrap();

    let updated = job.sync_all().await;
    assert_eq!(updated, 0);
    assert!(store.find("777").await.unwrap().unwrap().is_open());
}
