// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::config::{HEADER_LEN, MESSAGE_LOG_CAPACITY, PORT_NODEINFO};
use crate::core::address::{Address, AddressMode};
use crate::core::cipher::CipherMode;
use crate::core::frame::{build_frame, FrameFlags, FrameHeader};
use crate::core::packet::Packet;
use crate::protocol::engine::{ProtocolEngine, ProtocolMode};
use crate::protocol::message::MessageBody;
use crate::transport::{LoopbackMedium, LoopbackRadio, Transceiver};

const KEY: &[u8; 16] = b"thisis16byteskey";

fn addr(n: u8) -> Address {
    Address::new([n, n, n, n])
}

fn mesh_engine(
    medium: &LoopbackMedium,
    address: Address,
    nickname: &str,
) -> ProtocolEngine<LoopbackRadio> {
    ProtocolEngine::new(medium.attach(), address, nickname)
}

/// Decode an announcement frame captured by a probe radio.
fn expect_announcement(frame: &[u8]) {
    let (header, payload) = FrameHeader::parse(frame).expect("announcement header");
    assert!(header.dest.is_broadcast());
    let packet = Packet::decode(payload).expect("announcement packet");
    assert_eq!(packet.portnum, PORT_NODEINFO);
    assert!(!header.flags.ack_requested, "announcements never want acks");
}

#[test]
fn test_initialize_announces_exactly_once_in_mesh_mode() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();
    let mut engine = mesh_engine(&medium, addr(1), "argon");

    engine.initialize().expect("initialize");
    assert!(engine.is_simulation(), "no radio params means simulation");

    assert_eq!(probe.pending(), 1);
    let frame = probe.receive().expect("receive").expect("frame");
    expect_announcement(&frame);
}

#[test]
fn test_point_to_point_initialize_does_not_announce() {
    let medium = LoopbackMedium::new();
    let probe = medium.attach();
    let mut engine = ProtocolEngine::new(medium.attach(), addr(1), "argon")
        .with_mode(ProtocolMode::PointToPoint { peer: addr(2) })
        .with_address_mode(AddressMode::Dotted);

    engine.initialize().expect("initialize");
    assert_eq!(probe.pending(), 0);
}

#[test]
fn test_idle_reannouncement_after_threshold() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();
    let mut engine = mesh_engine(&medium, addr(1), "argon");
    engine.initialize().expect("initialize");
    probe.receive().expect("receive").expect("initial announcement");

    // 1000 idle polls: nothing yet
    for _ in 0..1000 {
        assert!(!engine.poll());
    }
    assert_eq!(probe.pending(), 0);

    // the 1001st idle poll triggers exactly one announcement
    assert!(!engine.poll());
    assert_eq!(probe.pending(), 1);
    expect_announcement(&probe.receive().expect("receive").expect("frame"));

    // counter reset: the next announcement takes another 1001 idle polls
    for _ in 0..1000 {
        engine.poll();
    }
    assert_eq!(probe.pending(), 0);
    engine.poll();
    assert_eq!(probe.pending(), 1);
}

#[test]
fn test_broadcast_and_own_address_admitted_others_dropped() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();
    let mut engine = mesh_engine(&medium, addr(2), "boron");

    let send_to = |probe: &mut LoopbackRadio, dest: Address| {
        let header = FrameHeader {
            dest,
            src: addr(9),
            msg_id: 7,
            flags: FrameFlags::new(3, false),
        };
        probe
            .send(&build_frame(&header, &Packet::text("hi").encode()))
            .expect("send");
    };

    // wrong destination: silently dropped
    send_to(&mut probe, addr(3));
    assert!(!engine.poll());
    assert!(engine.messages().is_empty());

    // own address: accepted
    send_to(&mut probe, addr(2));
    assert!(engine.poll());
    assert_eq!(engine.messages().len(), 1);

    // broadcast: accepted regardless of own address
    send_to(&mut probe, Address::BROADCAST);
    assert!(engine.poll());
    assert_eq!(engine.messages().len(), 2);
}

#[test]
fn test_short_and_garbage_frames_do_not_kill_the_loop() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();
    let mut engine = mesh_engine(&medium, addr(2), "boron");

    probe.send(&[0xAB; 7]).expect("send short frame");
    assert!(!engine.poll());
    assert!(engine.messages().is_empty());

    // correct header, garbage payload: decode failure, dropped
    let header = FrameHeader {
        dest: addr(2),
        src: addr(9),
        msg_id: 1,
        flags: FrameFlags::new(0, false),
    };
    probe
        .send(&build_frame(&header, &[0xFF; 20]))
        .expect("send garbage payload");
    assert!(!engine.poll());
    assert!(engine.messages().is_empty());

    // the loop keeps working afterwards
    probe
        .send(&build_frame(&header, &Packet::text("still alive").encode()))
        .expect("send");
    assert!(engine.poll());
    assert_eq!(engine.messages().len(), 1);
}

#[test]
fn test_join_notice_emitted_once_and_on_rename() {
    let medium = LoopbackMedium::new();
    let mut alice = mesh_engine(&medium, addr(1), "alice");
    let mut bob = mesh_engine(&medium, addr(2), "bob");

    alice.initialize().expect("initialize alice");

    // bob hears alice for the first time: join notice
    assert!(bob.poll());
    let notices: Vec<_> = bob
        .messages()
        .iter()
        .filter(|m| matches!(&m.body, MessageBody::Notice(n) if n.contains("alice")))
        .collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(bob.directory().resolve(addr(1)), Some("alice"));

    // bob re-announced reciprocally; alice learns bob and answers with
    // her own announcement, carrying the same name as before
    assert!(alice.poll());

    // the repeat announcement with an unchanged name: no new notice
    assert!(!bob.poll());
    assert_eq!(bob.messages().len(), 1);

    // a rename is a change and notifies again
    alice.set_nickname("alicia");
    assert!(bob.poll());
    assert_eq!(bob.directory().resolve(addr(1)), Some("alicia"));
    assert_eq!(bob.messages().len(), 2);
}

#[test]
fn test_nodeinfo_triggers_reciprocal_announcement() {
    let medium = LoopbackMedium::new();
    let mut alice = mesh_engine(&medium, addr(1), "alice");
    let mut bob = mesh_engine(&medium, addr(2), "bob");

    alice.initialize().expect("initialize alice");
    assert!(bob.poll());

    // bob answered with his own announcement; alice learns bob from it
    assert!(alice.poll());
    assert_eq!(alice.directory().resolve(addr(2)), Some("bob"));
}

#[test]
fn test_end_to_end_encrypted_broadcast() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();

    let mut alice = mesh_engine(&medium, addr(1), "alice")
        .with_cipher(CipherMode::from_key(Some(&KEY[..])).expect("key"));
    let mut bob = mesh_engine(&medium, addr(2), "bob")
        .with_cipher(CipherMode::from_key(Some(&KEY[..])).expect("key"));

    let sent = alice
        .send_text(Address::BROADCAST, "hello")
        .expect("send_text");
    assert!(sent.flags.ack_requested);
    assert_eq!(sent.flags.hops, 3);

    // the air carries ciphertext, not the plaintext
    let raw = probe.receive().expect("receive").expect("frame");
    let needle = b"hello";
    let on_air = &raw[HEADER_LEN..];
    assert!(
        !on_air.windows(needle.len()).any(|w| w == needle),
        "payload must be encrypted on the wire"
    );

    assert!(bob.poll());
    let received = &bob.messages()[0];
    assert_eq!(received.src, addr(1));
    assert_eq!(received.id, sent.id);
    assert_eq!(received.body, MessageBody::Text("hello".to_string()));

    // sender's own log shows the outbound message identically
    assert_eq!(alice.messages().len(), 1);
    assert_eq!(alice.messages()[0].body, MessageBody::Text("hello".to_string()));
}

#[test]
fn test_mismatched_keys_never_deliver_plaintext() {
    let medium = LoopbackMedium::new();
    let mut alice = mesh_engine(&medium, addr(1), "alice")
        .with_cipher(CipherMode::from_key(Some(&KEY[..])).expect("key"));
    let mut bob = mesh_engine(&medium, addr(2), "bob")
        .with_cipher(CipherMode::from_key(Some(&b"anotherkey-16b!!"[..])).expect("key"));

    alice.send_text(Address::BROADCAST, "hello").expect("send");
    bob.poll();

    // wrong key means garbage: usually a decode failure, never "hello"
    assert!(!bob
        .messages()
        .iter()
        .any(|m| m.body == MessageBody::Text("hello".to_string())));
}

#[test]
fn test_point_to_point_ack_probe_reply() {
    let medium = LoopbackMedium::new();
    let mut alice = ProtocolEngine::new(medium.attach(), addr(1), "alice")
        .with_mode(ProtocolMode::PointToPoint { peer: addr(2) })
        .with_address_mode(AddressMode::Dotted);
    let mut bob = ProtocolEngine::new(medium.attach(), addr(2), "bob")
        .with_mode(ProtocolMode::PointToPoint { peer: addr(1) })
        .with_address_mode(AddressMode::Dotted);

    alice.send_text(addr(2), "ping").expect("send");

    // bob logs the text and auto-replies with a link probe
    assert!(bob.poll());
    assert_eq!(bob.messages().len(), 1);
    assert_eq!(bob.messages()[0].body, MessageBody::Text("ping".to_string()));

    // alice receives the probe carrying bob's signal metrics
    assert!(alice.poll());
    let probe_msg = alice
        .messages()
        .iter()
        .find(|m| m.body.is_probe())
        .expect("probe reply logged");
    assert_eq!(
        probe_msg.body,
        MessageBody::LinkProbe { rssi: -91, snr: 7.5 }
    );
    assert!(
        !probe_msg.flags.ack_requested,
        "probe replies must not request acks"
    );

    // the probe itself triggers no further reply: bob stays idle
    assert!(!bob.poll());
    assert_eq!(bob.messages().len(), 1);
}

#[test]
fn test_user_text_with_probe_prefix_still_gets_a_reply() {
    let medium = LoopbackMedium::new();
    let mut alice = ProtocolEngine::new(medium.attach(), addr(1), "alice")
        .with_mode(ProtocolMode::PointToPoint { peer: addr(2) });
    let mut bob = ProtocolEngine::new(medium.attach(), addr(2), "bob")
        .with_mode(ProtocolMode::PointToPoint { peer: addr(1) });

    // looks nothing like a well-formed probe, so it is ordinary text
    alice.send_text(addr(2), "!|oops").expect("send");
    assert!(bob.poll());
    assert_eq!(bob.messages()[0].body, MessageBody::Text("!|oops".to_string()));

    // and ordinary ack-requested text earns a probe reply
    assert!(alice.poll());
    assert!(alice.messages().iter().any(|m| m.body.is_probe()));
}

#[test]
fn test_unhandled_portnum_logged_as_opaque_packet() {
    let medium = LoopbackMedium::new();
    let mut probe = medium.attach();
    let mut engine = mesh_engine(&medium, addr(2), "boron");

    let packet = Packet {
        portnum: 42,
        payload: vec![1, 2, 3],
        ..Packet::default()
    };
    let header = FrameHeader {
        dest: addr(2),
        src: addr(9),
        msg_id: 11,
        flags: FrameFlags::new(3, false),
    };
    probe
        .send(&build_frame(&header, &packet.encode()))
        .expect("send");

    assert!(engine.poll());
    assert_eq!(engine.messages()[0].body, MessageBody::Packet(packet));
}

#[test]
fn test_message_log_capacity_is_bounded() {
    let medium = LoopbackMedium::new();
    let mut engine = mesh_engine(&medium, addr(1), "argon");

    for i in 0..(MESSAGE_LOG_CAPACITY + 8) {
        engine
            .send_text(Address::BROADCAST, &format!("msg {i}"))
            .expect("send");
    }
    assert_eq!(engine.messages().len(), MESSAGE_LOG_CAPACITY);

    // oldest evicted first, newest kept
    assert_eq!(
        engine.messages()[0].body,
        MessageBody::Text("msg 8".to_string())
    );
    assert_eq!(
        engine.messages().back().expect("log not empty").body,
        MessageBody::Text(format!("msg {}", MESSAGE_LOG_CAPACITY + 7))
    );

    engine.clear_messages();
    assert!(engine.messages().is_empty());
}

#[test]
fn test_display_name_resolution() {
    let medium = LoopbackMedium::new();
    let mut alice = mesh_engine(&medium, addr(1), "alice");
    let mut bob = mesh_engine(&medium, addr(2), "bob");

    alice.initialize().expect("initialize");
    bob.poll();

    assert_eq!(bob.display_name(addr(2)), "bob", "own address is own nick");
    assert_eq!(bob.display_name(addr(1)), "alice");
    assert_eq!(bob.display_name(addr(9)), "09090909", "unknown falls back");
}

#[test]
fn test_from_config_wires_everything() {
    use crate::config::DeviceConfig;

    let config = DeviceConfig {
        address: "1.2.3.4".to_string(),
        nickname: "krypton".to_string(),
        mode: AddressMode::Dotted,
        key: Some(hex::encode(KEY)),
        peer: Some("5.6.7.8".to_string()),
        radio: None,
    };

    let medium = LoopbackMedium::new();
    let engine =
        ProtocolEngine::from_config(medium.attach(), &config).expect("engine from config");
    assert_eq!(engine.address(), Address::new([1, 2, 3, 4]));
    assert_eq!(engine.nickname(), "krypton");
    assert_eq!(
        engine.mode(),
        ProtocolMode::PointToPoint { peer: Address::new([5, 6, 7, 8]) }
    );
    assert_eq!(engine.format_address(addr(1)), "1.1.1.1");
}
