// src/codec.rs
//
// Text codec for the console.
// Received bytes are decoded with a streaming decoder so a multi-byte
// character split across two reads still decodes as one character.

use encoding_rs::{CoderResult, Decoder, Encoding};

use crate::settings::TextEncoding;

/// Map the configured encoding onto its `encoding_rs` implementation.
pub fn encoding_for(encoding: TextEncoding) -> &'static Encoding {
    match encoding {
        TextEncoding::Windows1251 => encoding_rs::WINDOWS_1251,
        TextEncoding::Ibm866 => encoding_rs::IBM866,
        TextEncoding::Utf8 => encoding_rs::UTF_8,
    }
}

/// Stateful decoder/encoder bound to one text encoding.
pub struct TextCodec {
    encoding: TextEncoding,
    decoder: Decoder,
}

impl TextCodec {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            decoder: encoding_for(encoding).new_decoder_without_bom_handling(),
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Decode the next chunk of a byte stream. Incomplete trailing sequences
    /// are held back until the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3);
        let mut out = String::with_capacity(capacity);
        let mut src = bytes;

        loop {
            let (result, read, _) = self.decoder.decode_to_string(src, &mut out, false);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => out.reserve(src.len().max(16) * 3),
            }
        }

        out
    }

    /// Decode a complete buffer (e.g. a file) without touching the stream state.
    pub fn decode_complete(&self, bytes: &[u8]) -> String {
        let (text, _) = encoding_for(self.encoding).decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Encode typed text. Characters the encoding cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let encoding = encoding_for(self.encoding);
        let mut out = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let (bytes, _, unmappable) = encoding.encode(ch.encode_utf8(&mut buf));
            if unmappable {
                out.push(b'?');
            } else {
                out.extend_from_slice(&bytes);
            }
        }
        out
    }
}
