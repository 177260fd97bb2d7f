//! whisker 树与 DNA 线路字节之间的编解码。
//! Codec between the whisker tree and DNA wire bytes.
//!
//! The on-disk layout is the trainer's proto2 schema. Field numbers are
//! unique across messages, one decade per message:
//!
//! 磁盘布局为训练器的 proto2 模式。字段编号跨消息唯一，每个消息占一个
//! 十位段：
//!
//! ```text
//! MemoryRange { lower = 11, upper = 12 }
//! Memory      { rec_send_ewma = 21, rec_rec_ewma = 22, rtt_ratio = 23, ... }
//! Whisker     { window_increment = 31 (sint32), window_multiple = 32,
//!               intersend = 33, domain = 34 }
//! WhiskerTree { domain = 41, children = 42 (repeated), leaf = 43, ... }
//! ```
//!
//! Unknown fields (optimizer settings and similar trainer metadata) are
//! skipped on decode.
//!
//! 未知字段（优化器设置等训练器元数据）在解码时被跳过。

use super::action::Action;
use super::cube::Cube;
use super::point::Point;
use super::rule_tree::{RuleTree, RuleTreeNode};
use crate::error::{Error, Result};
use crate::wire::{
    self, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT, read_double, read_len_delimited, read_tag,
    read_varint, write_tag, write_varint,
};
use bytes::{BufMut, Bytes, BytesMut};

const MEMORY_RANGE_LOWER: u32 = 11;
const MEMORY_RANGE_UPPER: u32 = 12;

const MEMORY_REC_SEND_EWMA: u32 = 21;
const MEMORY_REC_REC_EWMA: u32 = 22;
const MEMORY_RTT_RATIO: u32 = 23;

const WHISKER_WINDOW_INCREMENT: u32 = 31;
const WHISKER_WINDOW_MULTIPLE: u32 = 32;
const WHISKER_INTERSEND: u32 = 33;
const WHISKER_DOMAIN: u32 = 34;

const TREE_DOMAIN: u32 = 41;
const TREE_CHILDREN: u32 = 42;
const TREE_LEAF: u32 = 43;

/// Nesting bound for decoding. The trainer splits rules three axes at a
/// time, so real DNA files are far shallower than this.
/// 解码时的嵌套上限。训练器每次沿三个轴分裂规则，真实 DNA 文件远比
/// 这个值浅。
const MAX_TREE_DEPTH: usize = 64;

/// Reclassifies a wire-level failure while scanning for the next field. Past
/// the first field of the outermost message, such bytes are junk appended to
/// the file rather than a malformed tree field, and are reported as
/// [`Error::TrailingGarbage`]. Content errors inside a known field are not
/// routed through here and keep their own classification.
///
/// 重新归类扫描下一个字段时的线路级失败。在最外层消息的第一个字段之后，
/// 这类字节属于附加在文件末尾的垃圾而非畸形的树字段，报告为
/// [`Error::TrailingGarbage`]。已知字段内部的内容错误不经过此处，保留
/// 各自的归类。
fn classify_leftover(depth: usize, parsed_any: bool, error: Error) -> Error {
    if depth == 0 && parsed_any {
        Error::TrailingGarbage
    } else {
        error
    }
}

fn expect_wire_type(field: u32, wire_type: u8, expected: u8) -> Result<()> {
    if wire_type == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedWireType { field, wire_type })
    }
}

/// Decodes a `Memory` message into a point. Absent fields keep the proto2
/// default of zero.
/// 将 `Memory` 消息解码为一个点。缺失字段保持 proto2 的默认值零。
fn decode_memory(mut buf: Bytes) -> Result<Point> {
    let mut point = Point {
        ack_ewma: 0.,
        send_ewma: 0.,
        rtt_ratio: 0.,
    };
    while !buf.is_empty() {
        let (field, wire_type) = read_tag(&mut buf)?;
        match field {
            MEMORY_REC_SEND_EWMA => {
                expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                point.send_ewma = read_double(&mut buf)?;
            }
            MEMORY_REC_REC_EWMA => {
                expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                point.ack_ewma = read_double(&mut buf)?;
            }
            MEMORY_RTT_RATIO => {
                expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                point.rtt_ratio = read_double(&mut buf)?;
            }
            _ => wire::skip_field(&mut buf, field, wire_type)?,
        }
    }
    Ok(point)
}

fn decode_memory_range(mut buf: Bytes) -> Result<Cube> {
    let mut cube = Cube {
        min: Point {
            ack_ewma: 0.,
            send_ewma: 0.,
            rtt_ratio: 0.,
        },
        max: Point {
            ack_ewma: 0.,
            send_ewma: 0.,
            rtt_ratio: 0.,
        },
    };
    while !buf.is_empty() {
        let (field, wire_type) = read_tag(&mut buf)?;
        match field {
            MEMORY_RANGE_LOWER => {
                expect_wire_type(field, wire_type, WIRE_LEN)?;
                cube.min = decode_memory(read_len_delimited(&mut buf)?)?;
            }
            MEMORY_RANGE_UPPER => {
                expect_wire_type(field, wire_type, WIRE_LEN)?;
                cube.max = decode_memory(read_len_delimited(&mut buf)?)?;
            }
            _ => wire::skip_field(&mut buf, field, wire_type)?,
        }
    }
    Ok(cube)
}

fn decode_whisker(mut buf: Bytes) -> Result<Action> {
    let mut action = Action {
        window_multiplier: 0.,
        window_increment: 0,
        intersend_ms: 0.,
    };
    while !buf.is_empty() {
        let (field, wire_type) = read_tag(&mut buf)?;
        match field {
            WHISKER_WINDOW_INCREMENT => {
                expect_wire_type(field, wire_type, WIRE_VARINT)?;
                action.window_increment = wire::zigzag_decode_i32(read_varint(&mut buf)?);
            }
            WHISKER_WINDOW_MULTIPLE => {
                expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                action.window_multiplier = read_double(&mut buf)?;
            }
            WHISKER_INTERSEND => {
                expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                action.intersend_ms = read_double(&mut buf)?;
            }
            // The whisker repeats its own domain; the tree node's domain is
            // authoritative, so it is skipped here.
            _ => wire::skip_field(&mut buf, field, wire_type)?,
        }
    }
    Ok(action)
}

/// Decodes one `WhiskerTree` message, pushing its subtree into the arena in
/// post-order and returning the index of the subtree root.
///
/// 解码一个 `WhiskerTree` 消息，将其子树按后序压入 arena，并返回子树根的
/// 下标。
fn decode_tree(mut buf: Bytes, depth: usize, nodes: &mut Vec<RuleTreeNode>) -> Result<usize> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::TreeTooDeep);
    }
    let mut domain: Option<Cube> = None;
    let mut children: Vec<usize> = Vec::new();
    let mut leaf: Option<Action> = None;
    let mut parsed_any = false;
    while !buf.is_empty() {
        let (field, wire_type) =
            read_tag(&mut buf).map_err(|e| classify_leftover(depth, parsed_any, e))?;
        match field {
            TREE_DOMAIN => {
                expect_wire_type(field, wire_type, WIRE_LEN)?;
                domain = Some(decode_memory_range(read_len_delimited(&mut buf)?)?);
            }
            TREE_CHILDREN => {
                expect_wire_type(field, wire_type, WIRE_LEN)?;
                let child = read_len_delimited(&mut buf)?;
                children.push(decode_tree(child, depth + 1, nodes)?);
            }
            TREE_LEAF => {
                expect_wire_type(field, wire_type, WIRE_LEN)?;
                leaf = Some(decode_whisker(read_len_delimited(&mut buf)?)?);
            }
            _ => wire::skip_field(&mut buf, field, wire_type)
                .map_err(|e| classify_leftover(depth, parsed_any, e))?,
        }
        parsed_any = true;
    }
    let domain = domain.unwrap_or_default();
    let node = match (leaf, children.is_empty()) {
        (Some(action), true) => RuleTreeNode::Leaf { domain, action },
        (None, false) => RuleTreeNode::Node { domain, children },
        _ => return Err(Error::MalformedNode),
    };
    nodes.push(node);
    Ok(nodes.len() - 1)
}

/// Decodes a whole DNA payload into a rule tree.
/// 将整个 DNA 载荷解码为规则树。
pub fn decode(buf: Bytes) -> Result<RuleTree> {
    if buf.is_empty() {
        return Err(Error::EmptyTree);
    }
    let mut nodes = Vec::new();
    let root = decode_tree(buf, 0, &mut nodes)?;
    RuleTree::new(nodes, root)
}

fn put_len_delimited<B: BufMut>(buf: &mut B, field: u32, payload: &[u8]) {
    write_tag(buf, field, WIRE_LEN);
    write_varint(buf, payload.len() as u64);
    buf.put_slice(payload);
}

fn encode_memory(point: &Point) -> BytesMut {
    let mut buf = BytesMut::new();
    write_tag(&mut buf, MEMORY_REC_SEND_EWMA, WIRE_FIXED64);
    buf.put_f64_le(point.send_ewma);
    write_tag(&mut buf, MEMORY_REC_REC_EWMA, WIRE_FIXED64);
    buf.put_f64_le(point.ack_ewma);
    write_tag(&mut buf, MEMORY_RTT_RATIO, WIRE_FIXED64);
    buf.put_f64_le(point.rtt_ratio);
    buf
}

fn encode_memory_range(cube: &Cube) -> BytesMut {
    let mut buf = BytesMut::new();
    put_len_delimited(&mut buf, MEMORY_RANGE_LOWER, &encode_memory(&cube.min));
    put_len_delimited(&mut buf, MEMORY_RANGE_UPPER, &encode_memory(&cube.max));
    buf
}

fn encode_whisker(action: &Action, domain: &Cube) -> BytesMut {
    let mut buf = BytesMut::new();
    write_tag(&mut buf, WHISKER_WINDOW_INCREMENT, WIRE_VARINT);
    write_varint(&mut buf, wire::zigzag_encode_i32(action.window_increment));
    write_tag(&mut buf, WHISKER_WINDOW_MULTIPLE, WIRE_FIXED64);
    buf.put_f64_le(action.window_multiplier);
    write_tag(&mut buf, WHISKER_INTERSEND, WIRE_FIXED64);
    buf.put_f64_le(action.intersend_ms);
    put_len_delimited(&mut buf, WHISKER_DOMAIN, &encode_memory_range(domain));
    buf
}

fn encode_tree(tree: &RuleTree, idx: usize) -> BytesMut {
    let mut buf = BytesMut::new();
    let node = &tree.nodes()[idx];
    put_len_delimited(&mut buf, TREE_DOMAIN, &encode_memory_range(node.domain()));
    match node {
        RuleTreeNode::Node { children, .. } => {
            for &child in children {
                put_len_delimited(&mut buf, TREE_CHILDREN, &encode_tree(tree, child));
            }
        }
        RuleTreeNode::Leaf { domain, action } => {
            put_len_delimited(&mut buf, TREE_LEAF, &encode_whisker(action, domain));
        }
    }
    buf
}

/// Encodes a rule tree back into DNA wire bytes. Deterministic: encoding the
/// same tree twice yields identical bytes.
///
/// 将规则树重新编码为 DNA 线路字节。确定性：同一棵树两次编码得到完全
/// 相同的字节。
#[must_use]
pub fn encode(tree: &RuleTree) -> Bytes {
    encode_tree(tree, tree.root()).freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(min: f64, max: f64) -> Cube {
        Cube {
            min: Point {
                ack_ewma: min,
                send_ewma: min,
                rtt_ratio: min,
            },
            max: Point {
                ack_ewma: max,
                send_ewma: max,
                rtt_ratio: max,
            },
        }
    }

    fn action(increment: i32, multiplier: f64, intersend_ms: f64) -> Action {
        Action {
            window_multiplier: multiplier,
            window_increment: increment,
            intersend_ms,
        }
    }

    fn sample_tree() -> RuleTree {
        RuleTree::new(
            vec![
                RuleTreeNode::Leaf {
                    domain: cube(0., 50.),
                    action: action(3, 1.0, 2.5),
                },
                RuleTreeNode::Leaf {
                    domain: cube(50., 100.),
                    action: action(-2, 0.5, 10.0),
                },
                RuleTreeNode::Node {
                    domain: cube(0., 100.),
                    children: vec![0, 1],
                },
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_tree() {
        let tree = sample_tree();
        let decoded = decode(encode(&tree)).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let tree = sample_tree();
        assert_eq!(encode(&tree), encode(&tree));
    }

    #[test]
    fn test_reencode_is_byte_stable() {
        let bytes = encode(&sample_tree());
        let decoded = decode(bytes.clone()).unwrap();
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn test_decode_skips_unknown_fields() {
        let mut buf = BytesMut::new();
        // A trailing optimizer-config style field after a valid single leaf.
        let tree = RuleTree::single_rule(action(1, 1.0, 0.0));
        buf.put_slice(&encode(&tree));
        write_tag(&mut buf, 44, WIRE_LEN);
        write_varint(&mut buf, 2);
        buf.put_slice(&[0u8, 0u8]);

        let decoded = decode(buf.freeze()).unwrap();
        assert_eq!(decoded.num_rules(), 1);
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(matches!(decode(Bytes::new()), Err(Error::EmptyTree)));
    }

    #[test]
    fn test_decode_rejects_leaf_with_children() {
        let leaf = RuleTree::single_rule(action(1, 1.0, 0.0));
        let leaf_bytes = encode(&leaf);
        let mut buf = BytesMut::new();
        buf.put_slice(&leaf_bytes);
        // Graft a child onto the leaf message.
        put_len_delimited(&mut buf, TREE_CHILDREN, &leaf_bytes);
        assert!(matches!(
            decode(buf.freeze()),
            Err(Error::MalformedNode)
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let bytes = encode(&sample_tree());
        let truncated = bytes.slice(0..bytes.len() - 4);
        // The cut lands inside a known field's payload, so this is reported
        // as truncation, not as trailing garbage.
        assert!(matches!(decode(truncated), Err(Error::Truncated)));
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let mut buf = BytesMut::new();
        buf.put_slice(&encode(&sample_tree()));
        // An unterminated varint after the last valid field.
        buf.put_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            decode(buf.freeze()),
            Err(Error::TrailingGarbage)
        ));

        let mut buf = BytesMut::new();
        buf.put_slice(&encode(&sample_tree()));
        // A tag carrying the reserved field number zero.
        buf.put_slice(&[0x00]);
        assert!(matches!(
            decode(buf.freeze()),
            Err(Error::TrailingGarbage)
        ));
    }

    #[test]
    fn test_decode_garbage_from_the_start_is_not_trailing() {
        let mut bytes = BytesMut::new();
        bytes.put_slice(&[0xff]);
        assert!(matches!(
            decode(bytes.freeze()),
            Err(Error::Truncated)
        ));
    }

    #[test]
    fn test_decode_rejects_excessive_nesting() {
        // A chain of nested children deeper than the decoder allows.
        let mut inner = encode(&RuleTree::single_rule(action(0, 1.0, 0.0)));
        for _ in 0..80 {
            let mut outer = BytesMut::new();
            put_len_delimited(&mut outer, TREE_DOMAIN, &encode_memory_range(&cube(0., 1.)));
            put_len_delimited(&mut outer, TREE_CHILDREN, &inner);
            inner = outer.freeze();
        }
        assert!(matches!(decode(inner), Err(Error::TreeTooDeep)));
    }
}
