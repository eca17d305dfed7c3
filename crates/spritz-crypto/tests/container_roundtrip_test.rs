//! Cross-crate tests for the container format.
//!
//! Builds containers through the public API, then takes them apart by hand
//! with the engine, hash and KDF primitives to pin the byte layout, and
//! exercises rekeying, batch isolation and threaded use.

use flate2::read::ZlibDecoder;
use proptest::prelude::*;
use secrecy::SecretString;
use spritz_cipher::hash_bytes;
use spritz_core::ContainerConfig;
use spritz_crypto::{
    check, decrypt, decrypt_to, derive_header_engine, derive_payload_engine, encrypt, rekey,
    rekey_file, KdfParams, PayloadKey, SpritzError, FORMAT_VERSION, HEADER_SIZE,
};
use std::io::{Cursor, Read};

fn fast_config() -> ContainerConfig {
    ContainerConfig {
        kdf_base_rounds: 16,
        ..ContainerConfig::default()
    }
}

fn seal(password: &str, name: Option<&str>, plaintext: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    encrypt(
        &SecretString::from(password),
        name,
        plaintext,
        &mut out,
        &fast_config(),
    )
    .expect("encrypt");
    out
}

fn open(password: &str, ciphertext: &[u8]) -> Result<(Option<String>, Vec<u8>), SpritzError> {
    let mut out = Vec::new();
    let result = decrypt_to(
        &SecretString::from(password),
        ciphertext,
        &mut out,
        &fast_config(),
    )?;
    Ok((result.name, out))
}

/// Decode a container with nothing but the primitives, following the
/// documented layout field by field.
#[test]
fn layout_matches_manual_decode() {
    let password = "layout password";
    let plaintext = b"The quick brown fox jumps over the lazy dog. ".repeat(20);
    let ciphertext = seal(password, Some("/home/someone/fox.txt"), &plaintext);

    assert_eq!(ciphertext[0], FORMAT_VERSION);

    let mask = hash_bytes(32, password.as_bytes());
    let mut iv = [0u8; 4];
    for (n, slot) in iv.iter_mut().enumerate() {
        *slot = ciphertext[1 + n] ^ mask[n];
    }

    let params = KdfParams { base_rounds: 16 };
    let mut header = derive_header_engine(&SecretString::from(password), &iv, &params);

    let mut check_bytes = ciphertext[5..9].to_vec();
    header.squeeze_xor(&mut check_bytes);
    header.skip(check_bytes[3] as u64);
    let mut rest = ciphertext[9..HEADER_SIZE].to_vec();
    header.squeeze_xor(&mut rest);

    assert_eq!(&rest[..4], hash_bytes(32, &check_bytes).as_slice());

    let mut key = [0u8; 64];
    key.copy_from_slice(&rest[4..]);
    let mut payload = derive_payload_engine(&PayloadKey::from_bytes(key));

    let mut body = ciphertext[HEADER_SIZE..].to_vec();
    payload.squeeze_xor(&mut body);

    let name_len = body[0] as usize;
    assert_eq!(&body[1..1 + name_len], b"fox.txt", "only the basename is stored");

    let mut inflated = Vec::new();
    ZlibDecoder::new(&body[1 + name_len..])
        .read_to_end(&mut inflated)
        .expect("body is a zlib stream");
    assert_eq!(inflated, plaintext);
}

#[test]
fn name_roundtrip() {
    let (name, body) = open("pw", &seal("pw", Some("notes.txt"), b"m")).unwrap();
    assert_eq!(name.as_deref(), Some("notes.txt"));
    assert_eq!(body, b"m");

    let (name, _) = open("pw", &seal("pw", None, b"m")).unwrap();
    assert_eq!(name, None);
}

#[test]
fn unicode_names_survive() {
    let (name, _) = open("pw", &seal("pw", Some("résumé – 2024.pdf"), b"")).unwrap();
    assert_eq!(name.as_deref(), Some("résumé – 2024.pdf"));
}

#[test]
fn wrong_password_never_yields_plaintext() {
    let ciphertext = seal("correct", Some("a"), b"top secret");
    for guess in ["", "Correct", "correct ", "incorrect"] {
        assert!(
            matches!(open(guess, &ciphertext), Err(SpritzError::BadPasswordOrCorrupt)),
            "password {guess:?} must be rejected"
        );
    }
}

#[test]
fn foreign_file_rejected_before_kdf() {
    let result = check(
        &SecretString::from("pw"),
        b"%PDF-1.7 not a container".as_slice(),
        &fast_config(),
    );
    assert!(matches!(result, Err(SpritzError::UnsupportedVersion(b'%'))));
}

#[test]
fn truncated_containers_reported() {
    let ciphertext = seal("pw", Some("name.txt"), b"payload");
    for len in [0, 1, 40, HEADER_SIZE - 1] {
        let result = check(&SecretString::from("pw"), &ciphertext[..len], &fast_config());
        assert!(
            matches!(result, Err(SpritzError::TruncatedInput(_))),
            "length {len}"
        );
    }
}

#[test]
fn truncated_body_is_an_error() {
    let plaintext: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 253) as u8).collect();
    let ciphertext = seal("pw", None, &plaintext);
    let cut = &ciphertext[..ciphertext.len() - 10];
    assert!(open("pw", cut).is_err());
}

#[test]
fn lazy_partial_reads() {
    let plaintext: Vec<u8> = (0..200_000u32).map(|i| (i % 97) as u8).collect();
    let ciphertext = seal("pw", Some("big.bin"), &plaintext);

    let mut reader = decrypt(&SecretString::from("pw"), ciphertext.as_slice(), &fast_config())
        .expect("header");
    assert_eq!(reader.original_name(), Some("big.bin"));

    let mut first = [0u8; 7];
    reader.read_exact(&mut first).unwrap();
    assert_eq!(&first, &plaintext[..7]);

    assert_eq!(reader.skip(100_000).unwrap(), 100_000);

    let mut next = [0u8; 3];
    reader.read_exact(&mut next).unwrap();
    assert_eq!(&next, &plaintext[100_007..100_010]);
}

#[test]
fn rekey_in_place_keeps_body() {
    let config = fast_config();
    let old = SecretString::from("P");
    let new = SecretString::from("P2");
    let plaintext = b"rekey me".repeat(1000);
    let original = seal("P", Some("doc.txt"), &plaintext);

    let mut container = Cursor::new(original.clone());
    rekey(&mut container, &old, &new, &config).unwrap();
    let rekeyed = container.into_inner();

    assert_eq!(rekeyed.len(), original.len());
    assert_eq!(rekeyed[HEADER_SIZE..], original[HEADER_SIZE..]);
    assert_eq!(
        open("P2", &rekeyed).unwrap(),
        (Some("doc.txt".to_string()), plaintext)
    );
    assert!(matches!(open("P", &rekeyed), Err(SpritzError::BadPasswordOrCorrupt)));
}

#[test]
fn rekey_file_then_rekey_back() {
    let config = fast_config();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.dat");
    let original = seal("one", None, b"round trip through two passwords");
    std::fs::write(&path, &original).unwrap();

    rekey_file(&path, &SecretString::from("one"), &SecretString::from("two"), &config).unwrap();
    rekey_file(&path, &SecretString::from("two"), &SecretString::from("one"), &config).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_ne!(bytes[..HEADER_SIZE], original[..HEADER_SIZE], "fresh IV every time");
    assert_eq!(open("one", &bytes).unwrap().1, b"round trip through two passwords");
}

/// One bad container in a batch must not affect the others.
#[test]
fn batch_failures_are_isolated() {
    let mut batch: Vec<Vec<u8>> = (0..6)
        .map(|n| seal("pw", Some(&format!("item{n}")), format!("item {n}").as_bytes()))
        .collect();
    // verification hash field
    batch[2][10] ^= 0x40;
    batch[4].truncate(30);

    let results: Vec<_> = batch.iter().map(|c| open("pw", c)).collect();
    for (n, result) in results.iter().enumerate() {
        match n {
            2 => assert!(matches!(result, Err(SpritzError::BadPasswordOrCorrupt))),
            4 => assert!(matches!(result, Err(SpritzError::TruncatedInput(_)))),
            _ => assert_eq!(result.as_ref().unwrap().1, format!("item {n}").into_bytes()),
        }
    }
}

#[test]
fn containers_in_parallel_threads() {
    let handles: Vec<_> = (0..8)
        .map(|n| {
            std::thread::spawn(move || {
                let password = format!("thread password {n}");
                let plaintext = vec![n as u8; 10_000 + n * 17];
                let ciphertext = seal(&password, Some("t.bin"), &plaintext);
                let (name, body) = open(&password, &ciphertext).unwrap();
                assert_eq!(name.as_deref(), Some("t.bin"));
                assert_eq!(body, plaintext);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_password_and_payload_roundtrip(
        password in ".{0,24}",
        name in proptest::option::of("[a-zA-Z0-9_-][a-zA-Z0-9_.-]{0,39}"),
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let ciphertext = seal(&password, name.as_deref(), &plaintext);
        let (recovered_name, recovered) = open(&password, &ciphertext).unwrap();
        prop_assert_eq!(recovered_name, name);
        prop_assert_eq!(recovered, plaintext);
    }
}
