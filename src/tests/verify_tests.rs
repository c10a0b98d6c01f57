// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::KernelError;
use crate::tests::fixtures::{signed_move, signer};
use crate::verify::{hash_bytes, verify_envelope, verify_signature};

#[test]
fn test_sign_verify_and_tamper() {
    let s = signer(9);
    let cmd = signed_move(&s, 1_000, 3);
    let envelope = cmd.to_signed();
    assert!(verify_envelope(&envelope).is_ok());

    let mut tampered = envelope.clone();
    tampered.command_bytes[0] ^= 0x01;
    assert_eq!(verify_envelope(&tampered), Err(KernelError::InvalidSignature));

    let mut tampered = envelope;
    tampered.signature[10] ^= 0x01;
    assert_eq!(verify_envelope(&tampered), Err(KernelError::InvalidSignature));
}

#[test]
fn test_signature_from_other_key_rejected() {
    let a = signer(1);
    let b = signer(2);
    let sig = a.sign_bytes(b"payload");
    assert!(verify_signature(&a.address(), &sig, b"payload").is_ok());
    assert_eq!(
        verify_signature(&b.address(), &sig, b"payload"),
        Err(KernelError::InvalidSignature)
    );
}

#[test]
fn test_malformed_inputs() {
    let a = signer(1);
    assert_eq!(
        verify_signature(&[1, 2, 3], &a.sign_bytes(b"x"), b"x"),
        Err(KernelError::InvalidSignerAddress)
    );
    assert_eq!(
        verify_signature(&a.address(), &[0u8; 10], b"x"),
        Err(KernelError::InvalidSignature)
    );
}

#[test]
fn test_hash_bytes_is_blake3() {
    assert_eq!(
        hex::encode(hash_bytes(b"")),
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
    assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
}
