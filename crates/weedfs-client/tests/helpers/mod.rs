#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use weedfs_client::{LocationCache, ManualClock, WeedClient};
use weedfs_core::ClientConfig;

/// Config pointing the master at the mock server.
pub fn config_for(server: &ServerGuard) -> ClientConfig {
    ClientConfig::new(server.url()).with_request_timeout(Duration::from_secs(5))
}

pub fn client_for(server: &ServerGuard) -> WeedClient {
    WeedClient::new(config_for(server)).expect("client builds")
}

/// Client whose location cache runs on a clock the test controls.
pub fn client_with_clock(server: &ServerGuard, ttl: Duration) -> (WeedClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let cache = LocationCache::with_clock(clock.clone());
    let config = config_for(server).with_cache_ttl(ttl);
    let client = WeedClient::with_cache(config, cache).expect("client builds");
    (client, clock)
}

/// `/dir/lookup` answering with the given volume server addresses.
pub async fn mock_lookup(server: &mut ServerGuard, volume_id: &str, urls: &[String]) -> Mock {
    let locations: Vec<serde_json::Value> = urls
        .iter()
        .map(|u| serde_json::json!({ "url": u, "publicUrl": u }))
        .collect();
    let body = serde_json::json!({ "volumeId": volume_id, "locations": locations });

    server
        .mock("GET", "/dir/lookup")
        .match_query(Matcher::UrlEncoded("volumeId".into(), volume_id.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// `/dir/assign` handing out `fid` on the mock server itself.
pub async fn mock_assign(server: &mut ServerGuard, fid: &str, count: u32) -> Mock {
    let body = serde_json::json!({
        "fid": fid,
        "url": server.host_with_port(),
        "publicUrl": server.host_with_port(),
        "count": count,
    });

    server
        .mock("GET", "/dir/assign")
        .match_query(Matcher::UrlEncoded("count".into(), count.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}
