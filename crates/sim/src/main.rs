mod remote;

use anyhow::Result;
use clap::Parser;

use remote::{LossProfile, RemoteSim};
use ticksync::{ClockConfig, StateSync, SyncConfig, SyncError};

#[derive(Parser)]
#[command(name = "ticksync-sim")]
#[command(about = "Drives the tick synchronization core against a simulated remote")]
struct Args {
    #[arg(long, default_value_t = 10.0, help = "Simulated duration in seconds")]
    seconds: f64,

    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(long, default_value_t = 120, help = "Local frame rate")]
    frame_rate: u32,

    #[arg(long, default_value_t = 5, help = "Initial local clock lead in ticks")]
    offset_ticks: u32,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Local clock rate error (0.01 = 1% fast)"
    )]
    skew: f32,

    #[arg(long, default_value_t = 0.05)]
    correction_ratio: f32,

    #[arg(long, default_value_t = 128)]
    capacity: usize,

    #[arg(short, long, default_value_t = 8)]
    entities: u32,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_rate > 0, "tick rate must be nonzero");
    anyhow::ensure!(args.frame_rate > 0, "frame rate must be nonzero");

    let config = SyncConfig {
        tick_rate: args.tick_rate,
        frame_capacity: args.capacity,
        clock: ClockConfig {
            tick_interval: 1.0 / args.tick_rate as f32,
            max_correction_ratio: args.correction_ratio,
            correction_enabled: true,
        },
    };
    let mut sync = StateSync::new(config);

    let loss = LossProfile {
        loss_percent: args.loss_percent,
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    };
    let mut remote = RemoteSim::new(args.entities, 0, loss);

    let frame_dt = 1.0 / args.frame_rate as f64;
    let server_dt = 1.0 / args.tick_rate as f64;
    let mut sim_time = 0.0_f64;
    let mut server_accumulator = 0.0_f64;
    let mut next_report = 1.0_f64;

    let mut last_delivered_tick = 0_u32;
    let mut late_discarded = 0_u64;
    let mut offset_applied = false;

    log::info!(
        "running {}s at {} Hz server / {} Hz client, {} entities",
        args.seconds,
        args.tick_rate,
        args.frame_rate,
        args.entities
    );

    while sim_time < args.seconds {
        sim_time += frame_dt;
        server_accumulator += frame_dt;
        let now_ms = (sim_time * 1000.0) as u64;

        while server_accumulator >= server_dt {
            server_accumulator -= server_dt;
            remote.step(now_ms);
        }

        for update in remote.take_due(now_ms) {
            // Jitter can reorder the pipe; the transport contract is
            // in-order delivery, so late arrivals are discarded here.
            if update.server_tick <= last_delivered_tick {
                late_discarded += 1;
                continue;
            }
            last_delivered_tick = update.server_tick;

            match sync.process_update(&update) {
                Ok(outcome) => {
                    log::debug!(
                        "applied tick {} ({} entity changes)",
                        outcome.tick,
                        outcome.changes.len()
                    );
                    if !offset_applied {
                        // Push the local clock ahead once the first
                        // snapshot has anchored it.
                        let local = sync.clock().local_tick().unwrap_or(0);
                        sync.clock_mut().set_local_tick(local + args.offset_ticks);
                        offset_applied = true;
                    }
                }
                Err(SyncError::StaleBaseline { baseline }) => {
                    log::info!("baseline {} lost, requesting full update", baseline);
                    remote.request_full();
                }
                Err(err @ SyncError::Frame(_)) => {
                    log::warn!("protocol desync: {err}, resetting state");
                    sync.reset();
                    remote.request_full();
                }
            }
        }

        let local_dt = frame_dt as f32 * (1.0 + args.skew);
        sync.advance(local_dt);

        if sim_time >= next_report {
            next_report += 1.0;
            let stats = sync.stats();
            log::info!(
                "t={:>5.1}s drift={:+.2} ticks frames={} resyncs={} evicted={}",
                sim_time,
                sync.clock().current_clock_difference_ticks(),
                stats.frames_created,
                stats.forced_resyncs,
                stats.frames_evicted
            );
        }
    }

    let stats = sync.stats();
    println!("--- simulation summary ---");
    println!("server ticks run:      {}", remote.tick());
    println!(
        "updates emitted:       {} ({} dropped, {} late)",
        remote.updates_emitted, remote.updates_dropped, late_discarded
    );
    println!("updates applied:       {}", stats.updates_processed);
    println!("frames created:        {}", stats.frames_created);
    println!("frames evicted:        {}", stats.frames_evicted);
    println!("forced resyncs:        {}", stats.forced_resyncs);
    println!(
        "entity changes:        {} enter / {} leave / {} delta / {} preserved",
        stats.entities_entered,
        stats.entities_left,
        stats.entities_delta_updated,
        stats.entities_preserved
    );
    println!(
        "decoded bits:          {} player / {} other",
        stats.player_bits, stats.other_bits
    );
    println!(
        "final clock drift:     {:+.3} ticks ({:+.4}s)",
        sync.clock().current_clock_difference_ticks(),
        sync.clock().current_clock_difference()
    );

    Ok(())
}
