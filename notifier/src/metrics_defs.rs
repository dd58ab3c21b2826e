//! Metrics definitions for the notifier.

use shared::metrics_defs::{MetricDef, MetricType};

pub const INVOCATION: MetricDef = MetricDef {
    name: "relay.invocation",
    metric_type: MetricType::Counter,
    description: "Number of relay invocations, tagged by outcome",
};

pub const ERROR: MetricDef = MetricDef {
    name: "relay.error",
    metric_type: MetricType::Counter,
    description: "Number of failed invocations, tagged by error kind",
};

pub const SLACK_POST_DURATION: MetricDef = MetricDef {
    name: "slack.post.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a single chat.postMessage call in seconds",
};

pub const SNS_PUBLISH_DURATION: MetricDef = MetricDef {
    name: "sns.publish.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a single SNS publish call in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    INVOCATION,
    ERROR,
    SLACK_POST_DURATION,
    SNS_PUBLISH_DURATION,
];
