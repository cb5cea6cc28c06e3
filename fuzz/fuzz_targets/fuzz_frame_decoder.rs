//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming link decoder and
//! asserts that it never panics, that every accepted frame fits the wire
//! limits and re-encodes to the same bytes, and that a reset decoder
//! accepts input cleanly again.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use winlink::link::codec::MAX_PAYLOAD;
use winlink::link::{FrameDecoder, MAX_FRAME_LEN, Message};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    for &byte in data {
        let Some(Ok(frame)) = decoder.feed(byte) else {
            continue;
        };
        assert!(frame.payload().len() <= MAX_PAYLOAD, "payload exceeds MAX_PAYLOAD");

        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = frame.encode(&mut buf).expect("accepted frame must re-encode");
        let mut again = FrameDecoder::new();
        let back = buf[..n].iter().find_map(|&b| again.feed(b));
        assert_eq!(back, Some(Ok(frame)));

        // Message decoding may reject the frame but must not panic.
        let _ = Message::from_frame(&frame);
    }

    decoder.reset();
    for &byte in data {
        let _ = decoder.feed(byte);
    }
});
