//! proto2 线路格式的编解码原语。
//! Encoding/decoding primitives for the proto2 wire format.
//!
//! DNA files are protobuf messages written by the offline trainer. The
//! handful of wire-level constructs they use (varints, zigzag sint32,
//! little-endian doubles, length-delimited submessages) are implemented here
//! directly over [`bytes`], so the crate does not depend on generated code.
//!
//! DNA 文件是离线训练器写出的 protobuf 消息。它们用到的少量线路级构造
//! （varint、zigzag sint32、小端 double、带长度前缀的子消息）在此直接基于
//! [`bytes`] 实现，因此本库不依赖生成代码。

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes};

/// Wire type for varint-encoded fields.
/// varint 编码字段的线路类型。
pub const WIRE_VARINT: u8 = 0;
/// Wire type for 64-bit fixed-width fields (doubles).
/// 64 位定宽字段（double）的线路类型。
pub const WIRE_FIXED64: u8 = 1;
/// Wire type for length-delimited fields (submessages, strings).
/// 带长度前缀字段（子消息、字符串）的线路类型。
pub const WIRE_LEN: u8 = 2;
/// Wire type for 32-bit fixed-width fields.
/// 32 位定宽字段的线路类型。
pub const WIRE_FIXED32: u8 = 5;

const MAX_VARINT_BYTES: u32 = 10;

/// Reads a base-128 varint from the buffer.
/// 从缓冲区读取一个 base-128 varint。
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(Error::Truncated);
        }
        if shift >= MAX_VARINT_BYTES * 7 {
            return Err(Error::VarintOverflow);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Writes a base-128 varint into the buffer.
/// 向缓冲区写入一个 base-128 varint。
pub fn write_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decodes a zigzag-encoded `sint32` value.
/// 解码 zigzag 编码的 `sint32` 值。
pub fn zigzag_decode_i32(value: u64) -> i32 {
    let v = value as u32;
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Encodes an `i32` with zigzag encoding.
/// 以 zigzag 编码一个 `i32`。
pub fn zigzag_encode_i32(value: i32) -> u64 {
    u64::from(((value << 1) ^ (value >> 31)) as u32)
}

/// Reads a field tag, returning `(field_number, wire_type)`. Field number
/// zero is reserved by protobuf and rejected as malformed.
/// 读取字段标签，返回 `(字段编号, 线路类型)`。字段编号零为 protobuf
/// 保留值，视为畸形并拒绝。
pub fn read_tag<B: Buf>(buf: &mut B) -> Result<(u32, u8)> {
    let key = read_varint(buf)?;
    let field = (key >> 3) as u32;
    if field == 0 {
        return Err(Error::InvalidFieldNumber);
    }
    let wire_type = (key & 0x7) as u8;
    Ok((field, wire_type))
}

/// Writes a field tag.
/// 写入字段标签。
pub fn write_tag<B: BufMut>(buf: &mut B, field: u32, wire_type: u8) {
    write_varint(buf, (u64::from(field) << 3) | u64::from(wire_type));
}

/// Reads a little-endian `double` (wire type 1).
/// 读取小端 `double`（线路类型 1）。
pub fn read_double<B: Buf>(buf: &mut B) -> Result<f64> {
    if buf.remaining() < 8 {
        return Err(Error::Truncated);
    }
    Ok(buf.get_f64_le())
}

/// Splits off a length-delimited payload (wire type 2).
/// 切出一个带长度前缀的载荷（线路类型 2）。
pub fn read_len_delimited(buf: &mut Bytes) -> Result<Bytes> {
    let len = read_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| Error::VarintOverflow)?;
    if buf.remaining() < len {
        return Err(Error::Truncated);
    }
    Ok(buf.split_to(len))
}

/// Skips over a field of any known wire type. Unknown field numbers in a DNA
/// file (optimizer settings and the like) are passed through here so that
/// trainer output with extra fields still loads.
///
/// 跳过任意已知线路类型的字段。DNA 文件中未知的字段编号（优化器设置等）
/// 经由此处跳过，使带有额外字段的训练器输出仍可加载。
pub fn skip_field(buf: &mut Bytes, field: u32, wire_type: u8) -> Result<()> {
    match wire_type {
        WIRE_VARINT => {
            read_varint(buf)?;
        }
        WIRE_FIXED64 => {
            if buf.remaining() < 8 {
                return Err(Error::Truncated);
            }
            buf.advance(8);
        }
        WIRE_LEN => {
            read_len_delimited(buf)?;
        }
        WIRE_FIXED32 => {
            if buf.remaining() < 4 {
                return Err(Error::Truncated);
            }
            buf.advance(4);
        }
        _ => return Err(Error::UnexpectedWireType { field, wire_type }),
    }
    Ok(())
}
