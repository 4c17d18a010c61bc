use incpdf::{
    append_incremental_update, dictionary, Document, SecurityManager, StateManager, Stream,
};

mod utils;
use utils::*;

const FILE_KEY: &[u8] = b"0123456789abcdef";

fn append(document: &Document, document_length: u64) -> Vec<u8> {
    let mut update = Vec::new();
    append_incremental_update(document, &mut update, document_length).unwrap();
    update
}

#[test]
fn stream_is_deflated_then_encrypted() {
    let mut state = StateManager::new(classical_trailer(15, 1000));
    let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, b"hello".to_vec());
    state.set_object((12, 0), stream);
    let document = Document::with_security(state, SecurityManager::rc4(FILE_KEY.to_vec()));
    let update = append(&document, 500);

    assert!(contains(&update, b"12 0 obj\r\n"));
    let ciphertext = stream_payload(&update);
    assert_eq!(length_value(&update), ciphertext.len());

    // The payload is not plain zlib: it only inflates after decryption.
    let security = document.security.as_ref().unwrap();
    let deflated = security.decrypt_stream((12, 0), None, &ciphertext).unwrap();
    assert_ne!(deflated, ciphertext);
    assert_eq!(inflate(&deflated), b"hello");
}

#[test]
fn aes_streams_decrypt_back_to_the_original() {
    let mut state = StateManager::new(classical_trailer(15, 1000));
    let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, b"hello".to_vec());
    state.set_object((12, 0), stream);
    let document = Document::with_security(state, SecurityManager::aes_128(FILE_KEY.to_vec()));
    let update = append(&document, 500);

    let ciphertext = stream_payload(&update);
    assert_eq!(length_value(&update), ciphertext.len());
    assert_eq!(ciphertext.len() % 16, 0);

    let security = document.security.as_ref().unwrap();
    let deflated = security.decrypt_stream((12, 0), None, &ciphertext).unwrap();
    assert_eq!(inflate(&deflated), b"hello");
}

#[test]
fn identity_decode_parms_skip_encryption() {
    let mut state = StateManager::new(classical_trailer(15, 1000));
    let stream = Stream::new(
        dictionary! {
            "Filter" => "FlateDecode",
            "DecodeParms" => dictionary! { "Type" => "CryptFilterDecodeParms", "Name" => "Identity" },
        },
        b"hello".to_vec(),
    );
    state.set_object((12, 0), stream);
    let document = Document::with_security(state, SecurityManager::rc4(FILE_KEY.to_vec()));
    let update = append(&document, 500);

    // Deflated but never enciphered.
    assert_eq!(inflate(&stream_payload(&update)), b"hello");
}

#[test]
fn unfiltered_streams_are_encrypted_without_compression() {
    let mut state = StateManager::new(classical_trailer(15, 1000));
    state.set_object((8, 0), Stream::new(dictionary! {}, b"raw bytes".to_vec()));
    let document = Document::with_security(state, SecurityManager::rc4(FILE_KEY.to_vec()));
    let update = append(&document, 500);

    let ciphertext = stream_payload(&update);
    assert_eq!(ciphertext.len(), b"raw bytes".len());
    let security = document.security.as_ref().unwrap();
    assert_eq!(
        security.decrypt_stream((8, 0), None, &ciphertext).unwrap(),
        b"raw bytes"
    );
}

#[test]
fn already_compressed_payloads_pass_the_deflate_stage_untouched() {
    let deflated = {
        use std::io::Write as _;
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello").unwrap();
        encoder.finish().unwrap()
    };

    let mut state = StateManager::new(classical_trailer(15, 1000));
    let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, deflated.clone())
        .with_compressed_content(true);
    state.set_object((12, 0), stream);
    let document = Document::with_security(state, SecurityManager::rc4(FILE_KEY.to_vec()));
    let update = append(&document, 500);

    let security = document.security.as_ref().unwrap();
    let payload = security
        .decrypt_stream((12, 0), None, &stream_payload(&update))
        .unwrap();
    assert_eq!(payload, deflated);
    assert_eq!(inflate(&payload), b"hello");
}

#[test]
fn unencrypted_streams_are_just_deflated() {
    let mut state = StateManager::new(classical_trailer(15, 1000));
    let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, b"hello".to_vec());
    state.set_object((12, 0), stream);
    let update = append(&Document::new(state), 500);

    assert_eq!(inflate(&stream_payload(&update)), b"hello");
    assert!(contains(&update, b"/FormType 1 "));
}
