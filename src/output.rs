// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Demand-gated output channels.
//!
//! Every output is an [`OutputChannel`]: the pipeline asks each channel
//! whether anyone is listening before computing the data for it, so a cycle
//! costs only what its active consumers need.

use edgefirst_schemas::serde_cdr;
use serde::Serialize;
use tracing::{error, trace};
use zenoh::{
    Wait as _,
    bytes::{Encoding, ZBytes},
    pubsub::Publisher,
};

use crate::{
    formats::{PointLayout, to_point_cloud},
    lidar::{Batch, Error},
    markers::MarkerArray,
};

/// A sink that publishes `T` when it has at least one consumer.
pub trait OutputChannel<T>: Send {
    /// Whether a consumer is attached right now. Evaluated every cycle.
    fn has_consumer(&self) -> bool;

    /// Publish `msg`. Failures are handled by the channel.
    fn publish(&self, msg: &T);
}

/// The complete set of outputs driven by the pipeline.
pub struct Outputs {
    /// Valid points, XYZIR.
    pub points: Box<dyn OutputChannel<Batch>>,
    /// Valid points with every attribute, XYZIRADT.
    pub points_ex: Box<dyn OutputChannel<Batch>>,
    /// Confirmed invalid-near points, XYZIR.
    pub invalid_near: Box<dyn OutputChannel<Batch>>,
    /// Valid followed by invalid-near points, XYZIRADT.
    pub combined_ex: Box<dyn OutputChannel<Batch>>,
    /// Sensor housing markers.
    pub markers: Box<dyn OutputChannel<MarkerArray>>,
}

/// Topic suffixes under the base lidar topic.
pub const POINTS_TOPIC: &str = "points";
pub const POINTS_EX_TOPIC: &str = "points_ex";
pub const INVALID_NEAR_TOPIC: &str = "points_invalid_near";
pub const COMBINED_EX_TOPIC: &str = "points_combined_ex";
pub const MARKER_TOPIC: &str = "model_marker";

fn has_subscribers(publisher: &Publisher<'static>) -> bool {
    match publisher.matching_status().wait() {
        Ok(status) => status.matching(),
        Err(e) => {
            error!("{} matching status error: {:?}", publisher.key_expr(), e);
            false
        }
    }
}

fn put(publisher: &Publisher<'static>, msg: Result<Vec<u8>, serde_cdr::Error>, schema: &str) {
    let msg = match msg {
        Ok(v) => ZBytes::from(v),
        Err(e) => {
            error!("could not encode {}: {:?}", schema, e);
            return;
        }
    };
    let enc = Encoding::APPLICATION_CDR.with_schema(schema);

    match publisher.put(msg).encoding(enc).wait() {
        Ok(_) => trace!("{} message sent", publisher.key_expr()),
        Err(e) => error!("{} message error: {:?}", publisher.key_expr(), e),
    }
}

/// Publishes batches as `sensor_msgs/PointCloud2` over zenoh.
pub struct ZenohCloudChannel {
    publisher: Publisher<'static>,
    layout: PointLayout,
}

impl ZenohCloudChannel {
    pub fn new(publisher: Publisher<'static>, layout: PointLayout) -> Self {
        Self { publisher, layout }
    }
}

impl OutputChannel<Batch> for ZenohCloudChannel {
    fn has_consumer(&self) -> bool {
        has_subscribers(&self.publisher)
    }

    fn publish(&self, msg: &Batch) {
        let cloud = to_point_cloud(msg, self.layout);
        put(
            &self.publisher,
            serde_cdr::serialize(&cloud),
            "sensor_msgs/msg/PointCloud2",
        );
    }
}

/// Publishes CDR-encoded messages of a fixed schema over zenoh.
pub struct ZenohChannel {
    publisher: Publisher<'static>,
    schema: &'static str,
}

impl ZenohChannel {
    pub fn new(publisher: Publisher<'static>, schema: &'static str) -> Self {
        Self { publisher, schema }
    }
}

impl<T: Serialize> OutputChannel<T> for ZenohChannel {
    fn has_consumer(&self) -> bool {
        has_subscribers(&self.publisher)
    }

    fn publish(&self, msg: &T) {
        put(&self.publisher, serde_cdr::serialize(msg), self.schema);
    }
}

/// Declare the zenoh publishers for every output under `base_topic`.
pub async fn declare_outputs(session: &zenoh::Session, base_topic: &str) -> Result<Outputs, Error> {
    let cloud = |suffix: &str| {
        session
            .declare_publisher(format!("{}/{}", base_topic, suffix))
            .priority(zenoh::qos::Priority::DataHigh)
            .congestion_control(zenoh::qos::CongestionControl::Drop)
    };

    Ok(Outputs {
        points: Box::new(ZenohCloudChannel::new(
            cloud(POINTS_TOPIC).await?,
            PointLayout::Xyzir,
        )),
        points_ex: Box::new(ZenohCloudChannel::new(
            cloud(POINTS_EX_TOPIC).await?,
            PointLayout::Xyziradt,
        )),
        invalid_near: Box::new(ZenohCloudChannel::new(
            cloud(INVALID_NEAR_TOPIC).await?,
            PointLayout::Xyzir,
        )),
        combined_ex: Box::new(ZenohCloudChannel::new(
            cloud(COMBINED_EX_TOPIC).await?,
            PointLayout::Xyziradt,
        )),
        markers: Box::new(ZenohChannel::new(
            session
                .declare_publisher(format!("{}/{}", base_topic, MARKER_TOPIC))
                .priority(zenoh::qos::Priority::Background)
                .await?,
            "visualization_msgs/msg/MarkerArray",
        )),
    })
}
