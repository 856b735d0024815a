//! Sequential throttling. All upstream calls are issued one at a time with
//! short pauses in between to stay under abuse-detection thresholds.

use std::time::Duration;

const PAGE_DELAY: Duration = Duration::from_millis(150);
const USER_DELAY: Duration = Duration::from_millis(1000);

pub(crate) async fn between_pages() {
    tokio::time::sleep(PAGE_DELAY).await;
}

pub(crate) async fn between_users() {
    tokio::time::sleep(USER_DELAY).await;
}
