use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("palaver.session.turns");
pub(crate) static SESSION_MALFORMED_RESPONSES: Counter =
    Counter::new("palaver.session.malformed_responses");

pub(crate) static SINK_WRITE_ERRORS: Counter = Counter::new("palaver.sink.write_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_MALFORMED_RESPONSES);

    collector.register_counter(&SINK_WRITE_ERRORS);
}
