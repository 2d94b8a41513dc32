mod common;

use std::fs::File;
use std::io::{BufReader, BufWriter};

use boost_archive::xml::{Decoder, Encoder, XmlHeader};
use boost_archive::{Complex, EncoderOptions, Error, Shape, StreamState, Value};
use common::{animal, animal_shape, Manimal};
use tempfile::NamedTempFile;

const PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<!DOCTYPE boost_serialization>
<boost_serialization signature="serialization::archive" version="19">
"#;

fn encode(values: &[(&str, Value)]) -> String {
    let mut enc = Encoder::new(Vec::new());
    for (name, v) in values {
        enc.encode_named(name, v).unwrap();
    }
    String::from_utf8(enc.finish().unwrap()).unwrap()
}

#[test]
fn test_empty_archive() {
    let enc = Encoder::new(Vec::new());
    assert_eq!(enc.state(), StreamState::Fresh);
    assert!(enc.finish().unwrap().is_empty());
}

#[test]
fn test_document_layout() {
    let pet = Value::from(animal("pet", 4, 1));
    let doc = encode(&[("flag", Value::Bool(true)), ("pet", pet.clone()), ("pet", pet)]);

    let want = format!(
        "{PROLOG}<flag>1</flag>
<pet>
\t<class_id>0</class_id>
\t<tracking_level>0</tracking_level>
\t<version>0</version>
\t<name>pet</name>
\t<legs>4</legs>
\t<tails>1</tails>
</pet>
<pet>
\t<name>pet</name>
\t<legs>4</legs>
\t<tails>1</tails>
</pet>
</boost_serialization>
"
    );
    assert_eq!(doc, want);
}

#[test]
fn test_sequence_layout() {
    let strings = Value::sequence(Shape::String, ["s1", "s2"]);
    let zoo = Value::sequence(animal_shape(), [animal("tiger", 4, 1)]);
    let doc = encode(&[("strings", strings), ("zoo", zoo)]);

    let want = format!(
        "{PROLOG}<strings>
\t<count>2</count>
\t<item>s1</item>
\t<item>s2</item>
</strings>
<zoo>
\t<class_id>0</class_id>
\t<tracking_level>0</tracking_level>
\t<version>0</version>
\t<count>1</count>
\t<item_version>0</item_version>
\t<item>
\t\t<class_id>1</class_id>
\t\t<tracking_level>0</tracking_level>
\t\t<version>0</version>
\t\t<name>tiger</name>
\t\t<legs>4</legs>
\t\t<tails>1</tails>
\t</item>
</zoo>
</boost_serialization>
"
    );
    assert_eq!(doc, want);
}

#[test]
fn test_roundtrip() {
    let values = vec![
        Value::Bool(false),
        Value::I8(-0x11),
        Value::I16(0x2222),
        Value::I32(0x3333_3333),
        Value::I64(0x4444_4444_4444_4444),
        Value::U8(0xff),
        Value::U16(0x2222),
        Value::U32(0x0333_3333),
        Value::U64(0x0444_4444_4444_4444),
        Value::F32(2.2),
        Value::F64(3.3),
        Value::Complex64(Complex::new(1.5, -2.0)),
        Value::Complex128(Complex::new(-0.25, 1e300)),
        Value::from(" <hello> & 'bye' "),
        Value::from(""),
        Value::fixed_array(Shape::U8, [0x11u8, 0x22, 0x33]),
        Value::sequence(Shape::U8, [0x11u8, 0x22, 0x33, 0xff]),
        Value::from(animal("pet", 4, 1)),
        Value::from(animal("cat", 4, 1)),
        Value::sequence(animal_shape(), [animal("tiger", 4, 1), animal("monkey", 4, 1)]),
        Value::mapping(
            Shape::String,
            Shape::String,
            [("eins", "un"), ("zwei", "deux"), ("drei", "trois")],
        ),
        Value::mapping(Shape::I32, animal_shape(), [(1, animal("a", 2, 0)), (2, animal("b", 4, 1))]),
        Manimal::value("pet", 4, 1),
        Manimal::value("dog", 4, 1),
    ];

    let mut enc = Encoder::new(Vec::new());
    for v in &values {
        enc.encode(v).unwrap();
    }
    assert_eq!(enc.values(), values.len() as u64);
    let doc = enc.finish().unwrap();

    let mut dec = Decoder::new(&doc[..]).unwrap();
    assert_eq!(dec.header(), XmlHeader { version: 19 });
    assert_eq!(dec.remaining(), values.len());
    for v in &values {
        let got = dec.decode(&v.shape()).unwrap();
        assert_eq!(&got, v, "document:\n{}", String::from_utf8_lossy(&doc));
    }
    assert_eq!(dec.remaining(), 0);
    assert_eq!(dec.decode(&Shape::I8), Err(Error::UnexpectedEof));
}

#[test]
fn test_descriptor_as_attributes() {
    let doc = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<!DOCTYPE boost_serialization>
<boost_serialization signature="serialization::archive" version="17">
<pet class_id="0" tracking_level="0" version="1">
	<name>pet</name>
	<legs>4</legs>
	<tails>1</tails>
</pet>
<zoo class_id="1" tracking_level="0" version="0">
	<count>2</count>
	<item_version>0</item_version>
	<item>
		<name>tiger</name>
		<legs>4</legs>
		<tails>1</tails>
	</item>
	<item>
		<name>monkey</name>
		<legs>4</legs>
		<tails>1</tails>
	</item>
</zoo>
<arr class_id="2" tracking_level="0" version="0">
	<count>3</count>
	<item>1</item>
	<item>2</item>
	<item>3</item>
</arr>
</boost_serialization>
"#;
    let mut dec = Decoder::new(doc.as_bytes()).unwrap();
    assert_eq!(dec.header().version, 17);
    assert_eq!(dec.decode(&animal_shape()).unwrap(), Value::from(animal("pet", 4, 1)));
    assert_eq!(
        dec.decode(&Shape::sequence(animal_shape())).unwrap(),
        Value::sequence(animal_shape(), [animal("tiger", 4, 1), animal("monkey", 4, 1)])
    );
    assert_eq!(
        dec.decode(&Shape::fixed_array(Shape::I16, 3)).unwrap(),
        Value::fixed_array(Shape::I16, [1i16, 2, 3])
    );
}

#[test]
fn test_array_length_mismatch() {
    let doc = encode(&[("arr", Value::fixed_array(Shape::I32, [1i32, 2, 3]))]);
    let mut dec = Decoder::new(doc.as_bytes()).unwrap();
    let want = Error::InvalidArrayLen { expected: 2, got: 3 };
    assert_eq!(dec.decode(&Shape::fixed_array(Shape::I32, 2)), Err(want.clone()));
    assert_eq!(dec.state(), StreamState::Poisoned);
    assert_eq!(dec.decode(&Shape::I32), Err(want));
}

#[test]
fn test_malformed_number_poisons() {
    let doc = encode(&[("n", Value::from("12x")), ("m", Value::I32(5))]);
    let mut dec = Decoder::new(doc.as_bytes()).unwrap();
    let err = dec.decode(&Shape::I32).unwrap_err();
    assert!(matches!(err, Error::InvalidXmlValue { ref element, .. } if element == "i32"));
    assert_eq!(dec.decode(&Shape::I32), Err(err));
}

#[test]
fn test_unrepresentable_string_poisons() {
    let mut enc = Encoder::new(Vec::new());
    enc.encode_named("ok", &Value::I32(1)).unwrap();
    let err = enc.encode_named("s", &Value::from("a\u{1}b")).unwrap_err();
    assert!(matches!(err, Error::InvalidXmlValue { ref element, .. } if element == "s"));
    assert_eq!(enc.state(), StreamState::Poisoned);
    assert_eq!(enc.encode(&Value::from("fine")), Err(err.clone()));
    assert_eq!(enc.finish().unwrap_err(), err);

    // Tabs, newlines and carriage returns survive.
    let text = Value::from("a\tb\r\nc\n");
    let doc = encode(&[("s", text.clone())]);
    let mut dec = Decoder::new(doc.as_bytes()).unwrap();
    assert_eq!(dec.decode(&Shape::String).unwrap(), text);
}

#[test]
fn test_invalid_field_name() {
    for name in ["my field", "", "1x"] {
        let rec = Value::from(boost_archive::Record::new("r").field(name, 1i32));
        let mut enc = Encoder::new(Vec::new());
        let err = enc.encode_named("r", &rec).unwrap_err();
        assert!(matches!(err, Error::InvalidXmlValue { ref element, .. } if element == name));
        assert_eq!(enc.state(), StreamState::Poisoned);
    }

    let mut enc = Encoder::new(Vec::new());
    assert!(matches!(enc.encode_named("a b", &Value::I8(1)), Err(Error::InvalidXmlValue { .. })));
}

#[test]
fn test_nan_loses_sign_and_payload() {
    let neg = f64::from_bits(f64::NAN.to_bits() | (1 << 63));
    let payload = f32::from_bits(0x7fc0_0001);
    let doc = encode(&[("a", Value::F64(neg)), ("b", Value::F32(payload)), ("c", Value::F64(f64::INFINITY))]);
    let mut dec = Decoder::new(doc.as_bytes()).unwrap();
    assert!(matches!(dec.decode(&Shape::F64).unwrap(), Value::F64(v) if v.is_nan()));
    assert_eq!(dec.decode(&Shape::F32).unwrap(), Value::F32(f32::NAN));
    assert_eq!(dec.decode(&Shape::F64).unwrap(), Value::F64(f64::INFINITY));
}

#[test]
fn test_invalid_documents() {
    let binary = {
        let mut enc = boost_archive::binary::Encoder::new(Vec::new());
        enc.encode(&Value::from("hello")).unwrap();
        enc.into_inner()
    };
    assert_eq!(Decoder::new(&binary[..]).unwrap_err(), Error::NotBoost);
    assert_eq!(Decoder::new(&b"<a><b></a>"[..]).unwrap_err(), Error::NotBoost);
    assert_eq!(Decoder::new(&[0xffu8, 0xfe][..]).unwrap_err(), Error::NotBoost);
    assert_eq!(
        Decoder::new(&br#"<boost_serialization signature="serialization::archive" version="-1"/>"#[..])
            .unwrap_err(),
        Error::InvalidHeader
    );
}

#[test]
fn test_custom_without_xml_support() {
    #[derive(Debug)]
    struct BinaryOnly;

    impl boost_archive::CustomCodec for BinaryOnly {
        fn name(&self) -> &str {
            "binary-only"
        }

        fn marshal_binary(
            &self,
            value: &Value,
            w: &mut dyn boost_archive::binary::BinaryWrite,
        ) -> boost_archive::Result<()> {
            w.write_value(value)
        }

        fn unmarshal_binary(
            &self,
            r: &mut dyn boost_archive::binary::BinaryRead,
        ) -> boost_archive::Result<Value> {
            r.read_value(&Shape::I32)
        }
    }

    let v = Value::custom(std::sync::Arc::new(BinaryOnly), 7i32);
    let mut enc = Encoder::new(Vec::new());
    let err = enc.encode(&v).unwrap_err();
    assert!(matches!(err, Error::TypeNotSupported(_)));
    assert_eq!(enc.state(), StreamState::Poisoned);

    let mut enc = boost_archive::binary::Encoder::new(Vec::new());
    enc.encode(&v).unwrap();
    let bytes = enc.into_inner();
    let mut dec = boost_archive::binary::Decoder::new(&bytes[..]).unwrap();
    assert_eq!(dec.decode(&v.shape()).unwrap(), v);
}

#[test]
fn test_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let archive_path = temp_file.path().to_path_buf();

    let opts = EncoderOptions { version: 17, ..EncoderOptions::default() };
    let pet = Value::from(animal("pet", 4, 1));

    {
        let file = File::create(&archive_path).unwrap();
        let mut enc = Encoder::with_options(BufWriter::new(file), &opts);
        enc.encode_named("pet", &pet).unwrap();
        enc.finish().unwrap();
    }

    {
        let file = File::open(&archive_path).unwrap();
        let mut dec = Decoder::new(BufReader::new(file)).unwrap();
        assert_eq!(dec.header().version, 17);
        assert_eq!(dec.decode(&animal_shape()).unwrap(), pet);
    }
}
