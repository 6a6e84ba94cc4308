//! NTLMv2 message construction for Project Server's Windows authentication.
//!
//! Only the pieces needed for a client handshake are implemented: the Type 1
//! negotiate message, parsing the server's Type 2 challenge, and the Type 3
//! authenticate message with NTLMv2 / LMv2 responses (MS-NLMP 3.3.2).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;

use crate::error::{PsError, PsResult};

type HmacMd5 = Hmac<Md5>;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";
const TYPE1_HEADER_LEN: usize = 32;
const TYPE2_MIN_LEN: usize = 32;
const TYPE3_HEADER_LEN: usize = 64;

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const NEGOTIATE_OEM: u32 = 0x0000_0002;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

const CLIENT_FLAGS: u32 = NEGOTIATE_UNICODE
    | NEGOTIATE_OEM
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_128
    | NEGOTIATE_56;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Domain-qualified credential used for every request.
#[derive(Clone)]
pub struct NtlmCredentials {
    pub domain: String,
    pub username: String,
    pub password: String,
    pub workstation: String,
}

impl std::fmt::Debug for NtlmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtlmCredentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("workstation", &self.workstation)
            .finish()
    }
}

/// Server challenge decoded from a Type 2 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub flags: u32,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<u8>,
}

/// Type 1 message, base64 encoded for the `Authorization: NTLM` header.
pub fn negotiate_message() -> String {
    let mut msg = Vec::with_capacity(TYPE1_HEADER_LEN);
    msg.extend_from_slice(SIGNATURE);
    msg.extend_from_slice(&1u32.to_le_bytes());
    msg.extend_from_slice(&CLIENT_FLAGS.to_le_bytes());
    // Empty domain and workstation security buffers.
    msg.extend_from_slice(&[0u8; 16]);
    BASE64.encode(msg)
}

/// Extract the Type 2 payload from a `WWW-Authenticate` header value.
///
/// Returns `None` when the header is a bare `NTLM` offer without a challenge.
pub fn challenge_from_header(value: &str) -> Option<&str> {
    value
        .split(',')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("NTLM "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Decode a base64 Type 2 challenge.
pub fn parse_challenge(encoded: &str) -> PsResult<Challenge> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| PsError::Authentication(format!("challenge is not base64: {e}")))?;

    if bytes.len() < TYPE2_MIN_LEN || &bytes[..8] != SIGNATURE {
        return Err(PsError::Authentication(
            "challenge is not an NTLMSSP message".to_string(),
        ));
    }
    if read_u32(&bytes, 8) != Some(2) {
        return Err(PsError::Authentication(
            "expected an NTLM type 2 message".to_string(),
        ));
    }

    let flags = read_u32(&bytes, 20).unwrap_or_default();
    let mut server_challenge = [0u8; 8];
    server_challenge.copy_from_slice(&bytes[24..32]);

    let target_info = if bytes.len() >= 48 {
        let len = usize::from(read_u16(&bytes, 40).unwrap_or_default());
        let offset = read_u32(&bytes, 44).unwrap_or_default() as usize;
        bytes
            .get(offset..offset + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                PsError::Authentication("challenge target info out of bounds".to_string())
            })?
    } else {
        Vec::new()
    };

    Ok(Challenge {
        flags,
        server_challenge,
        target_info,
    })
}

/// Type 3 message answering `challenge`, base64 encoded.
pub fn authenticate_message(
    credentials: &NtlmCredentials,
    challenge: &Challenge,
    client_challenge: [u8; 8],
    timestamp: u64,
) -> PsResult<String> {
    let v2_hash = ntowf_v2(&credentials.password, &credentials.username, &credentials.domain)?;
    let lm_response = lmv2_response(&v2_hash, &challenge.server_challenge, &client_challenge)?;
    let nt_response = ntlmv2_response(
        &v2_hash,
        &challenge.server_challenge,
        &client_challenge,
        timestamp,
        &challenge.target_info,
    )?;

    let unicode = challenge.flags & NEGOTIATE_UNICODE != 0;
    let encode = |s: &str| if unicode { utf16le(s) } else { s.as_bytes().to_vec() };
    let domain = encode(&credentials.domain);
    let user = encode(&credentials.username);
    let workstation = encode(&credentials.workstation);

    let payloads: [&[u8]; 5] = [&lm_response, &nt_response, &domain, &user, &workstation];
    let mut header = Vec::with_capacity(TYPE3_HEADER_LEN);
    header.extend_from_slice(SIGNATURE);
    header.extend_from_slice(&3u32.to_le_bytes());

    let mut offset = TYPE3_HEADER_LEN;
    for payload in payloads {
        push_security_buffer(&mut header, payload.len(), offset)?;
        offset += payload.len();
    }
    // Empty session key.
    push_security_buffer(&mut header, 0, offset)?;
    header.extend_from_slice(&(challenge.flags & CLIENT_FLAGS).to_le_bytes());

    let mut msg = header;
    for payload in payloads {
        msg.extend_from_slice(payload);
    }
    Ok(BASE64.encode(msg))
}

/// Current time as a Windows FILETIME (100ns ticks since 1601).
pub fn filetime_now() -> u64 {
    let now = chrono::Utc::now();
    let secs = now.timestamp() + FILETIME_EPOCH_OFFSET_SECS;
    let ticks = i128::from(secs) * 10_000_000 + i128::from(now.timestamp_subsec_nanos() / 100);
    u64::try_from(ticks).unwrap_or_default()
}

pub(crate) fn nt_hash(password: &str) -> [u8; 16] {
    let digest = Md4::digest(utf16le(password));
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

pub(crate) fn ntowf_v2(password: &str, username: &str, domain: &str) -> PsResult<[u8; 16]> {
    let identity = format!("{}{}", username.to_uppercase(), domain);
    let identity = utf16le(&identity);
    hmac_md5(&nt_hash(password), &[identity.as_slice()])
}

pub(crate) fn lmv2_response(
    v2_hash: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> PsResult<Vec<u8>> {
    let proof = hmac_md5(v2_hash, &[server_challenge.as_slice(), client_challenge.as_slice()])?;
    let mut response = proof.to_vec();
    response.extend_from_slice(client_challenge);
    Ok(response)
}

pub(crate) fn ntlmv2_response(
    v2_hash: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    timestamp: u64,
    target_info: &[u8],
) -> PsResult<Vec<u8>> {
    let mut blob = Vec::with_capacity(32 + target_info.len());
    blob.extend_from_slice(&[0x01, 0x01, 0x00, 0x00]);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(client_challenge);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(target_info);
    blob.extend_from_slice(&[0u8; 4]);

    let proof = hmac_md5(v2_hash, &[server_challenge.as_slice(), blob.as_slice()])?;
    let mut response = proof.to_vec();
    response.extend_from_slice(&blob);
    Ok(response)
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> PsResult<[u8; 16]> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|e| PsError::Authentication(format!("hmac key rejected: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    let bytes = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn push_security_buffer(buf: &mut Vec<u8>, len: usize, offset: usize) -> PsResult<()> {
    let len = u16::try_from(len)
        .map_err(|_| PsError::Authentication("NTLM field too long".to_string()))?;
    let offset = u32::try_from(offset)
        .map_err(|_| PsError::Authentication("NTLM message too long".to_string()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    Ok(())
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}
