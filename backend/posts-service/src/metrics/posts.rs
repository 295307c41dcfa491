use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Paired User/Post transactions by operation (create, delete) and outcome.
    pub static ref POST_TRANSACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "post_transactions_total",
        "Post create/delete transactions segmented by operation and outcome",
        &["op", "outcome"]
    )
    .expect("failed to register post_transactions_total");

    pub static ref POST_TRANSACTION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "post_transaction_duration_seconds",
        "Wall time of post create/delete transactions",
        &["op"]
    )
    .expect("failed to register post_transaction_duration_seconds");

    /// Address lookups by outcome (ok, no_results, error).
    pub static ref GEOCODE_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geocode_requests_total",
        "Address lookups segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register geocode_requests_total");
}
