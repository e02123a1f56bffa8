//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a `tracing-subscriber` fmt layer filtered by
//! `RUST_LOG`. The compact format hides module paths (`with_target(false)`);
//! records carry structured fields instead.
//!
//! ## What Gets Traced
//!
//! - **Node lifecycle**: start, partition assignment and release, shutdown
//! - **Pipeline**: one `debug` line per routed, advanced, or emitted record with
//!   `order_id`, `partition`, `offset` and `status`
//! - **Status shards**: puts and gets at `debug`, ignored stale writes at `warn`
//! - **Queries**: a `status_of` span per lookup, forwarded calls at `debug`
//! - **Errors**: fatal worker exits at `error`, once from the worker and once
//!   from the node when it marks the partition halted
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle and shipped orders
//! RUST_LOG=info cargo run
//!
//! # Every record hop
//! RUST_LOG=debug cargo run
//!
//! # Only the query path
//! RUST_LOG=order_pipeline::query=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` one order produces a trail like:
//!
//! ```text
//! INFO place: Order placed order_id=6f1c... partition=1 offset=0 item_name="widget"
//! DEBUG Routing order order_id=6f1c... status=PENDING partition=1 offset=0
//! DEBUG Branched order_id=6f1c... branch=OrderMade
//! DEBUG Advanced stage="inventory-check" order_id=6f1c... from=ORDER_MADE to=INVENTORY_CHECKING
//! INFO Order shipped order_id=6f1c... item=widget partition=1 offset=0
//! ```

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Fields identify the source, not module paths
        .compact()
        .init();
}
