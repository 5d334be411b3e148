//! # Pipeline Tests
//!
//! End-to-end checks of the command path:
//!
//! 1. **Command channel**: bounded capacity and FIFO drain
//! 2. **Ingress**: unknown commands never reach the channel
//! 3. **Cleanup**: an off-screen sprite is swept exactly once
//! 4. **Loopback**: packets in, collision reports out, over real UDP
//!
//! Run with: cargo test -p pixlink_net --test pipeline_test -- --nocapture

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixlink_core::{
    CleanupMode, CommandChannel, CommandRecord, DisplayConfig, NullRasterizer, Opcode,
    PipelineConfig, SnapshotCell, SpriteConfig, SpriteRegistry, SpriteSpec,
};
use pixlink_net::pipeline::{go_channel, report_channel, Clock, IngressUnit};
use pixlink_net::protocol::PacketWriter;
use pixlink_net::{InboundPacket, OutboundPacket, Pipeline, PipelineError, ResponseKind};

fn encode(packet: &InboundPacket) -> Vec<u8> {
    let mut writer = PacketWriter::new();
    assert!(packet.encode(&mut writer));
    writer.as_slice().to_vec()
}

// ============================================================================
// COMMAND CHANNEL
// ============================================================================

#[test]
fn forty_pushes_into_thirty_two_slots() {
    let channel = CommandChannel::new(32);
    let records: Vec<CommandRecord> = (0..40u8)
        .map(|i| {
            let opcode = if i % 2 == 0 { Opcode::LoadSprite } else { Opcode::MoveSprite };
            CommandRecord::new(opcode).with_sprite(i).at(i16::from(i), -i16::from(i))
        })
        .collect();

    let accepted = records.iter().filter(|r| channel.try_push(**r)).count();
    assert_eq!(accepted, 31);
    assert_eq!(channel.stats().dropped, 9);

    let mut drained = Vec::new();
    assert_eq!(channel.drain(|r| drained.push(r)), 31);
    assert_eq!(drained, records[..31]);
    assert!(channel.is_empty());
}

#[test]
fn channel_is_fifo_across_threads() {
    let channel = Arc::new(CommandChannel::new(64));
    let producer = {
        let channel = Arc::clone(&channel);
        std::thread::spawn(move || {
            let mut sent = 0u16;
            while sent < 1_000 {
                let record = CommandRecord::new(Opcode::MoveSprite).at(sent as i16, 0);
                if channel.try_push(record) {
                    sent += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        })
    };

    let mut seen = Vec::with_capacity(1_000);
    let deadline = Instant::now() + Duration::from_secs(10);
    while seen.len() < 1_000 && Instant::now() < deadline {
        channel.drain(|r| seen.push(r.x));
    }
    producer.join().unwrap();

    let expected: Vec<i16> = (0..1_000).collect();
    assert_eq!(seen, expected);
}

// ============================================================================
// INGRESS
// ============================================================================

#[test]
fn unknown_command_is_discarded() {
    let config = PipelineConfig::default();
    let channel = Arc::new(CommandChannel::new(config.channel.command_capacity));
    let (_reports, report_rx) = report_channel(4);
    let (go, _go_rx) = go_channel();
    let mut ingress = IngressUnit::new(
        &config,
        None,
        Arc::clone(&channel),
        report_rx,
        go,
        Arc::new(SnapshotCell::default()),
        Clock::start(),
    );

    let from: SocketAddr = "192.168.1.20:5000".parse().unwrap();
    let bytes = encode(&InboundPacket { command: 0x42, object_id: 1, ..Default::default() });
    assert!(!ingress.handle_datagram(&bytes, from));

    assert_eq!(channel.stats().pushed, 0);
    assert!(channel.is_empty());
    assert_eq!(ingress.stats().unknown_commands, 1);
    assert_eq!(ingress.stats().commands_queued, 0);
}

// ============================================================================
// CLEANUP
// ============================================================================

#[test]
fn off_screen_sprite_is_swept_once() {
    let sprites = SpriteConfig { off_screen_margin: 64, ..SpriteConfig::default() };
    let field = DisplayConfig { width: 240, height: 240 };
    let mut registry = SpriteRegistry::new(&sprites, field);

    let spec = SpriteSpec::new(10, 10, 5, 5).with_cleanup(CleanupMode::OffScreen, 0);
    registry.create_at(0, spec, 0).unwrap();
    assert_eq!(registry.cleanup_off_screen(), 0);

    assert!(registry.set_position(0, -100, 10));
    assert_eq!(registry.cleanup_off_screen(), 1);
    assert!(!registry.contains(0));
    assert_eq!(registry.cleaned_up_total(), 1);

    assert_eq!(registry.cleanup_off_screen(), 0);
    assert_eq!(registry.cleaned_up_total(), 1);
}

// ============================================================================
// LOOPBACK
// ============================================================================

fn loopback_config(response_port: u16) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.network.bind_address = "127.0.0.1".to_string();
    config.network.listen_port = 0;
    config.network.response_port = response_port;
    config.sprites.bullet_velocity_y = 0;
    config
}

fn wait_for_report(
    socket: &UdpSocket,
    deadline: Instant,
    want: impl Fn(&OutboundPacket) -> bool,
) -> Option<OutboundPacket> {
    let mut buffer = [0u8; 64];
    while Instant::now() < deadline {
        let Ok((len, _)) = socket.recv_from(&mut buffer) else {
            continue;
        };
        if let Ok(packet) = OutboundPacket::decode(&buffer[..len]) {
            if want(&packet) {
                return Some(packet);
            }
        }
    }
    None
}

#[test]
fn loopback_collision_is_reported() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
    let config = loopback_config(peer.local_addr().unwrap().port());

    let pipeline = Pipeline::spawn(&config, Box::new(NullRasterizer)).unwrap();
    let target = pipeline.local_addr().expect("loopback bind should succeed");

    for _ in 0..2 {
        let fire = InboundPacket { command: 3, x: 100, y: 100, ..Default::default() };
        peer.send_to(&encode(&fire), target).unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    let collision =
        wait_for_report(&peer, deadline, |p| p.response == ResponseKind::CollisionDetected);
    let frame = wait_for_report(&peer, deadline, |p| p.response == ResponseKind::RenderComplete);

    let report = pipeline.stop().unwrap();

    let collision = collision.expect("collision report should arrive");
    assert_eq!((collision.object1_id, collision.object2_id), (0, 1));
    assert_eq!((collision.x, collision.y), (100, 100));
    assert_eq!(frame.expect("frame report should arrive").x, 2);

    assert_eq!(report.ingress.commands_queued, 2);
    assert_eq!(report.engine.commands_executed, 2);
    assert!(report.ingress.reports_sent >= 2);
}

#[test]
fn pipeline_runs_without_network() {
    let mut config = PipelineConfig::default();
    config.network.bind_address = "not-an-address".to_string();

    let pipeline = Pipeline::spawn(&config, Box::new(NullRasterizer)).unwrap();
    assert_eq!(pipeline.local_addr(), None);

    let deadline = Instant::now() + Duration::from_secs(5);
    while pipeline.stats().frame_count < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let report = pipeline.stop().unwrap();
    assert!(report.engine.frame_count >= 3);
    assert_eq!(report.ingress.reports_sent, 0);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = PipelineConfig::default();
    config.channel.command_capacity = 1;
    assert!(matches!(
        Pipeline::spawn(&config, Box::new(NullRasterizer)),
        Err(PipelineError::Config(_))
    ));
}
