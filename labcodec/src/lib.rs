//! A thin wrapper of [prost](https://docs.rs/prost/0.11.0/prost/)
//!
//! Every argument and reply that crosses the simulated network goes through
//! `encode` on one side and `decode` on the other, so the two sides never
//! share memory.

/// A labcodec message.
pub trait Message: prost::Message + Default {}
impl<T: prost::Message + Default> Message for T {}

/// A message encoding error.
pub type EncodeError = prost::EncodeError;
/// A message decoding error.
pub type DecodeError = prost::DecodeError;

/// Encodes the message to a `Vec<u8>`.
pub fn encode<M: Message>(message: &M, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    buf.reserve(message.encoded_len());
    message.encode(buf)?;
    Ok(())
}

/// Decodes an message from the buffer.
pub fn decode<M: Message>(buf: &[u8]) -> Result<M, DecodeError> {
    M::decode(buf)
}

#[cfg(test)]
mod tests {
    use prost_derive::Message;

    #[derive(Clone, PartialEq, Message)]
    struct Foo {
        #[prost(uint64, tag = "1")]
        bar: u64,
        #[prost(string, tag = "2")]
        baz: String,
        #[prost(bytes, tag = "3")]
        buf: Vec<u8>,
    }

    #[test]
    fn test_basic_encode_decode() {
        let foo = Foo {
            bar: 7,
            baz: "handler2-111".to_owned(),
            buf: vec![0, 1, 2],
        };
        let mut buf = vec![];
        super::encode(&foo, &mut buf).unwrap();
        let foo1: Foo = super::decode(&buf).unwrap();
        assert_eq!(foo, foo1);
    }

    #[test]
    fn test_default_value_is_empty() {
        let mut buf = vec![];
        super::encode(&Foo::default(), &mut buf).unwrap();
        assert!(buf.is_empty());
        let foo: Foo = super::decode(&buf).unwrap();
        assert_eq!(foo, Foo::default());
    }

    #[test]
    fn test_scalar_messages() {
        let mut buf = vec![];
        super::encode(&-9099i64, &mut buf).unwrap();
        assert_eq!(super::decode::<i64>(&buf).unwrap(), -9099);

        let mut buf = vec![];
        super::encode(&"9099".to_owned(), &mut buf).unwrap();
        assert_eq!(super::decode::<String>(&buf).unwrap(), "9099");
    }

    #[test]
    fn test_decode_garbage() {
        // a length-delimited field that claims more bytes than remain
        let buf = [0x12, 0x10, b'a'];
        assert!(super::decode::<Foo>(&buf).is_err());
    }
}
