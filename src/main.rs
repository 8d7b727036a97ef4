// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser as _;
use edgefirst_scanpub::{
    ConfigHandle, ConfigUpdate, Error, PacketBatch, PacketDecoder, PointRecordDecoder,
    ScanPipeline, output::declare_outputs, test_vector::TestVectorWriter,
};
use edgefirst_schemas::serde_cdr;
use kanal::Receiver;
use tracing::{debug, error, info, warn};

/// Pending packet batches between the subscriber and the processing thread.
const QUEUE_DEPTH: usize = 8;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.rust_log)
        .init();

    let session = zenoh::open(zenoh::config::Config::try_from(&args)?).await?;
    debug!("opened zenoh session");

    let decoder = PointRecordDecoder::new(args.num_lasers);
    let config = ConfigHandle::new((&args).into(), decoder.num_lasers());
    let outputs = declare_outputs(&session, &args.lidar_topic).await?;

    let mut pipeline = ScanPipeline::new(Box::new(decoder), config, outputs);
    if args.save_test_vector {
        pipeline = pipeline.with_test_vectors(TestVectorWriter::create(&args.test_vector_dir)?);
        info!("saving test vectors to {}", args.test_vector_dir.display());
    }

    spawn_config_listener(&session, &args.lidar_topic, pipeline.config().clone()).await?;

    let (tx, rx) = kanal::bounded(QUEUE_DEPTH);
    let processor = std::thread::Builder::new()
        .name("convert".to_string())
        .spawn(move || convert_thread(pipeline, rx))?;

    let subscriber = session.declare_subscriber(args.packets_topic.as_str()).await?;
    info!("converting {} into {}/*", args.packets_topic, args.lidar_topic);

    let tx = tx.to_async();
    while let Ok(sample) = subscriber.recv_async().await {
        let scan: PacketBatch = match serde_cdr::deserialize(&sample.payload().to_bytes()) {
            Ok(v) => v,
            Err(e) => {
                warn!("dropping malformed packet batch: {:?}", e);
                continue;
            }
        };

        if tx.send(scan).await.is_err() {
            error!("convert thread exited");
            break;
        }
    }

    drop(tx);
    match tokio::task::spawn_blocking(move || processor.join()).await {
        Ok(Ok(())) => debug!("convert thread finished"),
        _ => error!("convert thread panicked"),
    }

    Ok(())
}

/// Processes packet batches one at a time, in arrival order.
fn convert_thread(mut pipeline: ScanPipeline, rx: Receiver<PacketBatch>) {
    while let Ok(scan) = rx.recv() {
        pipeline.process_packet_batch(&scan);
    }
    debug!("packet queue closed");
}

/// Apply JSON reconfiguration requests published on `<lidar_topic>/config`.
async fn spawn_config_listener(
    session: &zenoh::Session,
    lidar_topic: &str,
    config: ConfigHandle,
) -> Result<(), zenoh::Error> {
    let topic = format!("{}/config", lidar_topic);
    let subscriber = session.declare_subscriber(topic.clone()).await?;

    tokio::spawn(async move {
        while let Ok(sample) = subscriber.recv_async().await {
            let update = match ConfigUpdate::from_json(&sample.payload().to_bytes()) {
                Ok(v) => v,
                Err(e) => {
                    warn!("{}: invalid configuration update: {}", topic, e);
                    continue;
                }
            };

            let result = config.reconfigure(&update);
            info!("{}: {}", topic, result.reason);
        }
    });

    Ok(())
}
