// utils.rs - utilities
//
// simple-irc-server - simple IRC server
// Copyright (C) 2022  Mateusz Szpakowski
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use bytes::{BufMut, BytesMut};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};
use validator::ValidationError;

// maximal length of nickname: one leading character and 50 following.
pub(crate) const MAX_NICKNAME_LENGTH: usize = 51;
// maximal length of received line (without CRLF).
pub(crate) const MAX_LINE_LENGTH: usize = 2000;

// line codec that always ends lines by CRLF.
// A received line longer than max_length (CRLF not counted) is not an error:
// it is decoded as an empty line and `take_line_too_long` returns true once.
#[derive(Debug)]
pub(crate) struct IRCLinesCodec {
    codec: LinesCodec,
    line_too_long: bool,
}

impl IRCLinesCodec {
    pub(crate) fn new_with_max_length(max_length: usize) -> IRCLinesCodec {
        IRCLinesCodec {
            // LinesCodec counts the '\r' before '\n'.
            codec: LinesCodec::new_with_max_length(max_length + 1),
            line_too_long: false,
        }
    }

    pub(crate) fn take_line_too_long(&mut self) -> bool {
        std::mem::take(&mut self.line_too_long)
    }

    fn map_too_long(
        &mut self,
        res: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<String>, LinesCodecError> {
        match res {
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                // LinesCodec discards the rest of that line itself.
                self.line_too_long = true;
                Ok(Some(String::new()))
            }
            res => res,
        }
    }
}

impl Encoder<String> for IRCLinesCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), LinesCodecError> {
        buf.reserve(line.len() + 2);
        buf.put(line.as_bytes());
        buf.put_slice(b"\r\n");
        Ok(())
    }
}

impl Decoder for IRCLinesCodec {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        let res = self.codec.decode(buf);
        self.map_too_long(res)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        let res = self.codec.decode_eof(buf);
        self.map_too_long(res)
    }
}

pub(crate) type BufferedLineStream = Framed<TcpStream, IRCLinesCodec>;

fn is_nick_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

/// Checks nickname grammar: a letter or special character first, then letters,
/// digits, specials or '-', at most MAX_NICKNAME_LENGTH characters.
pub(crate) fn validate_nickname(nick: &str) -> bool {
    let mut chars = nick.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || is_nick_special(first) => {}
        _ => return false,
    }
    nick.len() <= MAX_NICKNAME_LENGTH
        && chars.all(|c| c.is_ascii_alphanumeric() || is_nick_special(c) || c == '-')
}

pub(crate) fn validate_nickname_config(nick: &str) -> Result<(), ValidationError> {
    if validate_nickname(nick) {
        Ok(())
    } else {
        Err(ValidationError::new("Nickname must be a valid IRC nickname."))
    }
}

pub(crate) fn validate_password_hash(hash: &str) -> Result<(), ValidationError> {
    match PasswordHash::new(hash) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("Wrong password Argon2 hash")),
    }
}

pub(crate) fn argon2_hash_password(
    password: &str,
) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub(crate) fn argon2_verify_password(
    password: &str,
    hash_str: &str,
) -> Result<(), argon2::password_hash::Error> {
    let hash = PasswordHash::new(hash_str)?;
    Argon2::default().verify_password(password.as_bytes(), &hash)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname("alice"));
        assert!(validate_nickname("[bob]"));
        assert!(validate_nickname("a-b_c|d^e`f{g}"));
        assert!(validate_nickname("X123"));
        assert!(!validate_nickname(""));
        assert!(!validate_nickname("1alice"));
        assert!(!validate_nickname("-alice"));
        assert!(!validate_nickname("ali ce"));
        assert!(!validate_nickname("alice!"));
        assert!(!validate_nickname("żółw"));
        assert!(validate_nickname(&"a".repeat(MAX_NICKNAME_LENGTH)));
        assert!(!validate_nickname(&"a".repeat(MAX_NICKNAME_LENGTH + 1)));
    }

    #[test]
    fn test_validate_password_hash() {
        assert!(validate_password_hash(&argon2_hash_password("xxxxxx").unwrap()).is_ok());
        assert!(validate_password_hash("plaintext").is_err());
    }

    #[test]
    fn test_argon2_verify_password() {
        let hash = argon2_hash_password("top_secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, argon2_hash_password("top_secret").unwrap());
        assert!(argon2_verify_password("top_secret", &hash).is_ok());
        assert!(argon2_verify_password("top_secreT", &hash).is_err());
        assert!(argon2_verify_password("", &hash).is_err());
        assert!(argon2_verify_password("top_secret", "garbage").is_err());
    }

    #[test]
    fn test_irc_lines_codec() {
        let mut codec = IRCLinesCodec::new_with_max_length(2000);
        let mut buf = BytesMut::new();
        codec.encode("PING :abc".to_string(), &mut buf).unwrap();
        assert_eq!(&b"PING :abc\r\n"[..], &buf[..]);

        let mut buf = BytesMut::from(&b"NICK alice\r\nUSER a 0 * :A\r\nPA"[..]);
        assert_eq!(Some("NICK alice".to_string()), codec.decode(&mut buf).unwrap());
        assert_eq!(Some("USER a 0 * :A".to_string()), codec.decode(&mut buf).unwrap());
        assert_eq!(None, codec.decode(&mut buf).unwrap());
    }

    #[test]
    fn test_irc_lines_codec_too_long() {
        let mut codec = IRCLinesCodec::new_with_max_length(10);
        let mut buf = BytesMut::from(&b"PRIVMSG #chan :very long line\r\nPING x\r\n"[..]);
        assert!(!codec.take_line_too_long());
        assert_eq!(Some(String::new()), codec.decode(&mut buf).unwrap());
        assert!(codec.take_line_too_long());
        assert!(!codec.take_line_too_long());
        assert_eq!(Some("PING x".to_string()), codec.decode(&mut buf).unwrap());
        assert!(!codec.take_line_too_long());
    }

    #[test]
    fn test_irc_lines_codec_too_long_split() {
        let mut codec = IRCLinesCodec::new_with_max_length(10);
        let mut buf = BytesMut::from(&b"PRIVMSG #chan :very"[..]);
        assert_eq!(Some(String::new()), codec.decode(&mut buf).unwrap());
        assert!(codec.take_line_too_long());
        // rest of the overlong line arrives later and is skipped.
        buf.extend_from_slice(b" long line\r\nPING y\r\n");
        assert_eq!(Some("PING y".to_string()), codec.decode(&mut buf).unwrap());
        assert!(!codec.take_line_too_long());
    }

    #[test]
    fn test_irc_lines_codec_max_length_without_crlf() {
        let mut codec = IRCLinesCodec::new_with_max_length(10);
        let mut buf = BytesMut::from(&b"0123456789\r\n0123456789A\r\n0123456789\n"[..]);
        assert_eq!(Some("0123456789".to_string()), codec.decode(&mut buf).unwrap());
        assert!(!codec.take_line_too_long());
        assert_eq!(Some(String::new()), codec.decode(&mut buf).unwrap());
        assert!(codec.take_line_too_long());
        assert_eq!(Some("0123456789".to_string()), codec.decode(&mut buf).unwrap());
        assert!(!codec.take_line_too_long());
    }
}
