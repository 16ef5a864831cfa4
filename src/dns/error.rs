use norn_proto::buffer::reader::ReaderError;
use norn_proto::buffer::writer::WriterError;
use std::fmt::Display;

#[derive(Debug)]
pub enum HandleError {
    Chain(std::io::Error),
    Writer(WriterError),
    Reader(ReaderError),
    Io(std::io::Error),
}

impl Display for HandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chain(inner) => write!(f, "chain lookup failed: {inner}"),
            Self::Writer(inner) => write!(f, "unable to write message: {inner}"),
            Self::Reader(inner) => write!(f, "unable to read message: {inner}"),
            Self::Io(inner) => write!(f, "io error: {inner}"),
        }
    }
}

impl std::error::Error for HandleError {}

impl From<WriterError> for HandleError {
    fn from(value: WriterError) -> Self {
        Self::Writer(value)
    }
}

impl From<ReaderError> for HandleError {
    fn from(value: ReaderError) -> Self {
        Self::Reader(value)
    }
}

impl From<std::io::Error> for HandleError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
