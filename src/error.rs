//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the Remy DNA policy library.
/// Remy DNA 策略库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The DNA file does not exist at the given path.
    /// 给定路径下不存在 DNA 文件。
    #[error("DNA file not found: {0}")]
    NotFound(PathBuf),

    /// An underlying I/O error occurred while reading or writing a DNA file.
    /// 读写 DNA 文件时发生了底层的 I/O 错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not carry the `.remy.dna` suffix expected for a
    /// serialized whisker tree.
    /// 路径不带序列化 whisker 树所要求的 `.remy.dna` 后缀。
    #[error("not a .remy.dna file: {0}")]
    InvalidPath(PathBuf),

    /// The file ended in the middle of a field.
    /// 文件在字段中间意外结束。
    #[error("truncated DNA encoding")]
    Truncated,

    /// A varint ran past its maximum width.
    /// varint 超出了最大宽度。
    #[error("varint overflow in DNA encoding")]
    VarintOverflow,

    /// A field tag used the reserved field number zero.
    /// 字段标签使用了保留的字段编号零。
    #[error("invalid field number 0 in DNA encoding")]
    InvalidFieldNumber,

    /// Undecodable bytes followed an otherwise valid whisker tree.
    /// 一棵本来合法的 whisker 树之后跟着无法解码的字节。
    #[error("trailing garbage after whisker tree")]
    TrailingGarbage,

    /// A known field was encoded with the wrong wire type.
    /// 已知字段使用了错误的线路类型编码。
    #[error("field {field} has unexpected wire type {wire_type}")]
    UnexpectedWireType {
        /// The protobuf field number.
        /// protobuf 字段编号。
        field: u32,
        /// The wire type that was actually read.
        /// 实际读到的线路类型。
        wire_type: u8,
    },

    /// A tree node was neither a leaf nor a parent, or was both at once.
    /// 树节点既不是叶子也不是父节点，或两者同时成立。
    #[error("malformed whisker tree node (must be leaf xor parent)")]
    MalformedNode,

    /// The file decoded to a tree without any rule.
    /// 文件解码后得到一棵没有任何规则的树。
    #[error("whisker tree is empty")]
    EmptyTree,

    /// Nesting exceeded the decoder's depth limit; the file is corrupt or
    /// adversarial.
    /// 嵌套超过了解码器的深度上限；文件已损坏或是恶意构造。
    #[error("whisker tree exceeds maximum nesting depth")]
    TreeTooDeep,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::NotFound(_) => ErrorKind::NotFound.into(),
            Error::InvalidPath(_) => ErrorKind::InvalidInput.into(),
            Error::Truncated
            | Error::VarintOverflow
            | Error::InvalidFieldNumber
            | Error::TrailingGarbage
            | Error::UnexpectedWireType { .. }
            | Error::MalformedNode
            | Error::EmptyTree
            | Error::TreeTooDeep => ErrorKind::InvalidData.into(),
        }
    }
}
