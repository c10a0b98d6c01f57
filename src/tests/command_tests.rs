// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::codec;
use crate::error::KernelError;
use crate::tests::fixtures::{address, signed_move, signer, Move, Say};
use crate::types::{AuthMode, Command, CommandRaw, SignedCommand, Tick, TickData};

#[test]
fn test_command_bytes_are_what_was_signed() {
    let s = signer(1);
    let cmd = signed_move(&s, 1_000, 7);

    assert_eq!(cmd.command_bytes, cmd.decoded.to_bytes().unwrap());
    assert_eq!(cmd.auth_info.signer_address, s.address());
    assert_eq!(cmd.name(), "move");
    assert_eq!(cmd.payload::<Move>().unwrap(), Move { dx: 1, dy: -1 });
}

#[test]
fn test_payload_kind_mismatch_rejected() {
    let cmd = signed_move(&signer(1), 1_000, 7);
    let err = cmd.payload::<Say>().unwrap_err();
    assert!(matches!(err, KernelError::Schema(_)));
}

#[test]
fn test_command_serializes_as_envelope_only() {
    let cmd = signed_move(&signer(2), 5_000, 1);

    let as_command = codec::encode(&cmd).unwrap();
    let as_envelope = codec::encode(&cmd.to_signed()).unwrap();
    assert_eq!(as_command, as_envelope);

    let back: Command = codec::decode(&as_command).unwrap();
    assert_eq!(back, cmd);
}

#[test]
fn test_garbage_command_bytes_fail_decode() {
    let s = signer(3);
    let signed = SignedCommand {
        signature: s.sign_bytes(b"junk"),
        auth_info: crate::types::AuthInfo { mode: AuthMode::Direct, signer_address: s.address() },
        command_bytes: b"junk".to_vec(),
    };
    assert!(Command::from_signed(signed.clone()).is_err());

    // A tick carrying such an envelope cannot be decoded either.
    let bytes = codec::encode(&(0u64, vec![signed])).unwrap();
    assert!(codec::decode::<(u64, Vec<Command>)>(&bytes).is_err());
}

#[test]
fn test_schema_rejects_empty_name_and_address() {
    let mut raw = CommandRaw::new(10, [0; 16], address(), "", &Move { dx: 0, dy: 0 }).unwrap();
    raw.body.name.clear();
    assert!(matches!(raw.validate(), Err(KernelError::Schema(_))));

    let mut raw = CommandRaw::new(10, [0; 16], address(), "", &Move { dx: 0, dy: 0 }).unwrap();
    raw.body.address.project.clear();
    assert!(matches!(raw.validate(), Err(KernelError::Schema(_))));

    let raw = CommandRaw::new(0, [0; 16], address(), "", &Move { dx: 0, dy: 0 }).unwrap();
    assert!(CommandRaw::from_bytes(&raw.to_bytes().unwrap()).is_err());
}

#[test]
fn test_signed_command_json_uses_hex() {
    let cmd = signed_move(&signer(4), 9_000, 2);
    let json = serde_json::to_value(cmd.to_signed()).unwrap();

    let sig = json["signature"].as_str().unwrap();
    assert_eq!(sig.len(), 128);
    assert_eq!(hex::decode(sig).unwrap(), cmd.signature);

    let back: SignedCommand = serde_json::from_value(json).unwrap();
    assert_eq!(back, cmd.to_signed());
}

#[test]
fn test_tick_data_typed_view() {
    let s = signer(5);
    let mv = signed_move(&s, 1, 1);
    let raw = CommandRaw::new(2, [2; 16], address(), "bob", &Say { text: "hi".into() }).unwrap();
    let say = Command::from_signed(s.sign(&raw, AuthMode::Direct).unwrap()).unwrap();

    let tick = Tick::new(3, 100, vec![say, mv.clone()]);
    let moves: Vec<_> = tick.data.of_kind::<Move>().collect::<Result<_, _>>().unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].0, &mv);

    let says: Vec<_> = tick.data.of_kind::<Say>().map(|r| r.unwrap().1).collect();
    assert_eq!(says, vec![Say { text: "hi".into() }]);
    assert!(TickData::default().is_empty());
}
