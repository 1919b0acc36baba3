use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

lazy_static::lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "glimpse_http_requests_total", "Total HTTP requests", &["method", "path", "status"]
    ).unwrap();
    pub static ref SEARCH_DURATION: Histogram = register_histogram!(
        "glimpse_search_duration_seconds", "Search duration including enrichment",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();
    pub static ref SEARCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "glimpse_searches_total", "Total searches", &["outcome"]
    ).unwrap();
    pub static ref ENRICHMENT_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "glimpse_enrichment_failures_total", "Per-result enrichment failures", &["stage", "kind"]
    ).unwrap();
    pub static ref DROPPED_ORDINALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "glimpse_dropped_ordinals_total", "Index hits without a metadata record", &["reason"]
    ).unwrap();
    pub static ref BUILD_ITEMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "glimpse_build_items_total", "Images processed by the index builder", &["outcome"]
    ).unwrap();
}

pub fn init() {
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&SEARCH_DURATION);
    lazy_static::initialize(&SEARCHES_TOTAL);
    lazy_static::initialize(&ENRICHMENT_FAILURES_TOTAL);
    lazy_static::initialize(&DROPPED_ORDINALS_TOTAL);
    lazy_static::initialize(&BUILD_ITEMS_TOTAL);
}
