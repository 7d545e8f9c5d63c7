//! VLESS request header parsing and serialization.
//!
//! The header is read from the first message of a connection:
//!
//! ```text
//! +-----+------------+--------+---------+-----+------+------+---------+---------+
//! | VER | CREDENTIAL | OPTLEN | OPTIONS | CMD | PORT | ATYP | ADDRESS | PAYLOAD |
//! +-----+------------+--------+---------+-----+------+------+---------+---------+
//! |  1  |     16     |   1    |  OPTLEN |  1  |  2   |  1   |   var   |   ...   |
//! +-----+------------+--------+---------+-----+------+------+---------+---------+
//! ```
//!
//! Parsing is zero-copy and bounds-checked at every field; a short buffer is
//! reported as [`ParseError::Truncated`], never a panic.

use std::borrow::Cow;
use std::fmt;
use std::net::Ipv4Addr;

use bytes::BytesMut;

pub const CREDENTIAL_LEN: usize = 16;

/// Protocol version written by [`write_request_header`] callers that do not care.
pub const VERSION: u8 = 0;

pub const CMD_CONNECT: u8 = 0x01;
/// UDP associate. Decoded but never served.
pub const CMD_UDP: u8 = 0x02;

pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x02;
pub const ATYP_IPV6: u8 = 0x03;

/// Maximum domain name length (bounded by the length byte).
pub const MAX_DOMAIN_LEN: usize = 255;
/// Maximum options block length (bounded by the length byte).
pub const MAX_OPTIONS_LEN: usize = 255;

/// Smallest complete header: no options, IPv4 address, empty payload.
pub const MIN_HEADER_LEN: usize = 1 + CREDENTIAL_LEN + 1 + 1 + 2 + 1 + 4;

/// Offset of the options length byte.
const OPTLEN_OFFSET: usize = 1 + CREDENTIAL_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer ends before the field at this many total bytes is complete.
    Truncated(usize),
    InvalidAtyp(u8),
    InvalidDomainLen,
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Truncated(need) => write!(f, "header truncated, need {need} bytes"),
            ParseError::InvalidAtyp(atyp) => write!(f, "invalid address type {atyp:#04x}"),
            ParseError::InvalidDomainLen => f.write_str("empty domain"),
            ParseError::InvalidUtf8 => f.write_str("domain is not valid utf-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that can occur when writing protocol data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// Domain name exceeds 255 bytes.
    DomainTooLong,
    /// Options block exceeds 255 bytes.
    OptionsTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRef<'a> {
    Ipv4([u8; 4]),
    Domain(&'a str),
    Ipv6([u8; 16]),
}

impl HostRef<'_> {
    /// Address type byte for this host.
    pub fn atyp(&self) -> u8 {
        match self {
            HostRef::Ipv4(_) => ATYP_IPV4,
            HostRef::Domain(_) => ATYP_DOMAIN,
            HostRef::Ipv6(_) => ATYP_IPV6,
        }
    }

    /// Host text used to open the outbound connection.
    ///
    /// IPv6 uses the eight-hextet form deployed clients rely on: hextet `i`
    /// is the big-endian word at offset `2 * i` counted from the address
    /// type byte, printed in lowercase hex without leading zeros and without
    /// `::` compression.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            HostRef::Ipv4(ip) => Cow::Owned(Ipv4Addr::from(*ip).to_string()),
            HostRef::Domain(domain) => Cow::Borrowed(*domain),
            HostRef::Ipv6(ip) => Cow::Owned(render_ipv6_window(ip)),
        }
    }
}

fn render_ipv6_window(ip: &[u8; 16]) -> String {
    let mut window = [0u8; 17];
    window[0] = ATYP_IPV6;
    window[1..].copy_from_slice(ip);
    window[..16]
        .chunks_exact(2)
        .map(|pair| format!("{:x}", u16::from_be_bytes([pair[0], pair[1]])))
        .collect::<Vec<_>>()
        .join(":")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRef<'a> {
    pub host: HostRef<'a>,
    pub port: u16,
}

impl fmt::Display for AddressRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host {
            HostRef::Ipv6(_) => write!(f, "[{}]:{}", self.host.render(), self.port),
            _ => write!(f, "{}:{}", self.host.render(), self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlessRequest<'a> {
    pub version: u8,
    pub credential: &'a [u8; CREDENTIAL_LEN],
    /// Opaque options block, not interpreted.
    pub options: &'a [u8],
    pub command: u8,
    pub address: AddressRef<'a>,
    /// Offset of the first payload byte in the parsed buffer.
    pub header_len: usize,
    pub payload: &'a [u8],
}

impl VlessRequest<'_> {
    #[inline]
    pub fn is_connect(&self) -> bool {
        self.command == CMD_CONNECT
    }
}

/// Parse a complete request header from the first message of a connection.
///
/// The command byte is returned as-is; deciding which commands are served is
/// left to the caller.
pub fn parse_request(buf: &[u8]) -> Result<VlessRequest<'_>, ParseError> {
    let version = *need(buf, 0)?;
    let credential: &[u8; CREDENTIAL_LEN] = buf
        .get(1..OPTLEN_OFFSET)
        .and_then(|s| s.try_into().ok())
        .ok_or(ParseError::Truncated(OPTLEN_OFFSET))?;

    let opt_len = *need(buf, OPTLEN_OFFSET)? as usize;
    let mut offset = OPTLEN_OFFSET + 1;
    let options = slice(buf, offset, opt_len)?;
    offset += opt_len;

    let command = *need(buf, offset)?;
    offset += 1;

    let port = read_u16(slice(buf, offset, 2)?);
    offset += 2;

    let atyp = *need(buf, offset)?;
    offset += 1;

    let (host, consumed) = parse_address(atyp, &buf[offset..])
        .map_err(|e| shift_truncated(e, offset))?;
    offset += consumed;

    Ok(VlessRequest {
        version,
        credential,
        options,
        command,
        address: AddressRef { host, port },
        header_len: offset,
        payload: &buf[offset..],
    })
}

/// Decode the address bytes that follow the address type byte.
///
/// Returns the host and the number of bytes consumed from `buf`.
/// `Truncated` lengths are relative to `buf`.
pub fn parse_address(atyp: u8, buf: &[u8]) -> Result<(HostRef<'_>, usize), ParseError> {
    match atyp {
        ATYP_IPV4 => {
            let b = slice(buf, 0, 4)?;
            Ok((HostRef::Ipv4([b[0], b[1], b[2], b[3]]), 4))
        }
        ATYP_DOMAIN => {
            let len = *need(buf, 0)? as usize;
            if len == 0 {
                return Err(ParseError::InvalidDomainLen);
            }
            let raw = slice(buf, 1, len)?;
            let domain = std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8)?;
            Ok((HostRef::Domain(domain), 1 + len))
        }
        ATYP_IPV6 => {
            let mut ip = [0u8; 16];
            ip.copy_from_slice(slice(buf, 0, 16)?);
            Ok((HostRef::Ipv6(ip), 16))
        }
        other => Err(ParseError::InvalidAtyp(other)),
    }
}

/// Encode the two-byte acknowledgment sent before any relayed data.
#[inline]
pub fn response(version: u8) -> [u8; 2] {
    [version, 0]
}

/// Writes a request header to the buffer.
///
/// # Errors
/// - `OptionsTooLong` if `options` is longer than 255 bytes.
/// - `DomainTooLong` if the address is a domain longer than 255 bytes.
#[allow(clippy::cast_possible_truncation)]
pub fn write_request_header(
    buf: &mut BytesMut,
    version: u8,
    credential: &[u8; CREDENTIAL_LEN],
    options: &[u8],
    command: u8,
    address: &AddressRef<'_>,
) -> Result<(), WriteError> {
    if options.len() > MAX_OPTIONS_LEN {
        return Err(WriteError::OptionsTooLong);
    }
    if let HostRef::Domain(d) = address.host {
        if d.len() > MAX_DOMAIN_LEN {
            return Err(WriteError::DomainTooLong);
        }
    }
    buf.extend_from_slice(&[version]);
    buf.extend_from_slice(credential);
    buf.extend_from_slice(&[options.len() as u8]);
    buf.extend_from_slice(options);
    buf.extend_from_slice(&[command]);
    buf.extend_from_slice(&address.port.to_be_bytes());
    buf.extend_from_slice(&[address.host.atyp()]);
    match address.host {
        HostRef::Ipv4(ip) => buf.extend_from_slice(&ip),
        HostRef::Ipv6(ip) => buf.extend_from_slice(&ip),
        HostRef::Domain(domain) => {
            buf.extend_from_slice(&[domain.len() as u8]);
            buf.extend_from_slice(domain.as_bytes());
        }
    }
    Ok(())
}

#[inline]
fn need(buf: &[u8], idx: usize) -> Result<&u8, ParseError> {
    buf.get(idx).ok_or(ParseError::Truncated(idx + 1))
}

#[inline]
fn slice(buf: &[u8], start: usize, len: usize) -> Result<&[u8], ParseError> {
    buf.get(start..start + len)
        .ok_or(ParseError::Truncated(start + len))
}

#[inline]
fn shift_truncated(err: ParseError, offset: usize) -> ParseError {
    match err {
        ParseError::Truncated(n) => ParseError::Truncated(offset + n),
        other => other,
    }
}

#[inline]
fn read_u16(buf: &[u8]) -> u16 {
    debug_assert!(buf.len() >= 2, "read_u16 requires at least 2 bytes");
    u16::from_be_bytes([buf[0], buf[1]])
}
