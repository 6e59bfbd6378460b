use std::{
    collections::BTreeMap,
    io,
    net::Ipv4Addr,
    sync::{mpsc::Sender, Arc},
    thread,
    time::Duration,
};

use structex::{
    parse::{Message, Reader, Value, WireField, WireType},
    Config, Encode, EncodeError, Encoder, Primitive, Sink, FIRST_USER_ID,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn read(stream: &[u8]) -> Vec<Message> {
    Reader::new().read_all(stream).unwrap()
}

fn plain(name: &str, ty: Primitive) -> WireField {
    WireField {
        name: name.into(),
        ty: ty.id(),
        tag: None,
    }
}

#[derive(Encode)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

#[derive(Encode)]
struct Line {
    from: Point,
    to: Point,
    tags: Vec<String>,
}

#[derive(Encode)]
struct Node {
    value: u32,
    children: Vec<Node>,
}

#[derive(Encode)]
struct Job {
    id: u8,
    done: Sender<u8>,
}

#[derive(Encode)]
struct Cached {
    key: u16,
    #[structex(skip)]
    hits: u64,
}

#[derive(Encode)]
#[structex(name = "Pos")]
struct Position(u8, i8);

#[derive(Encode)]
struct Wrapper<T> {
    inner: T,
}

#[derive(Encode)]
struct Peer {
    addr: Ipv4Addr,
    timeout: Duration,
}

#[derive(Encode)]
struct Lookup {
    entries: BTreeMap<String, u8>,
}

#[derive(Encode)]
struct Maybe {
    value: Option<u32>,
}

#[test]
fn struct_round_trip() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    let point = Point {
        x: -1,
        y: 2,
        label: "a".into(),
    };
    encoder.encode(&point).unwrap();
    encoder.encode(&point).unwrap();

    let messages = read(&encoder.into_inner());
    let value = Message::Value {
        id: FIRST_USER_ID,
        value: Value::Struct(vec![
            ("x".into(), Value::Int(-1)),
            ("y".into(), Value::Int(2)),
            ("label".into(), Value::String("a".into())),
        ]),
    };
    assert_eq!(
        messages,
        vec![
            Message::Type {
                id: FIRST_USER_ID,
                wire_type: WireType::Struct {
                    name: "Point".into(),
                    fields: vec![
                        plain("x", Primitive::I32),
                        plain("y", Primitive::I32),
                        plain("label", Primitive::String),
                    ],
                },
            },
            value.clone(),
            value,
        ]
    );
}

#[test]
fn nested_types_are_described_in_first_use_order() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    let p = || Point {
        x: 0,
        y: 0,
        label: String::new(),
    };
    encoder
        .encode(&Line {
            from: p(),
            to: p(),
            tags: vec!["t".into()],
        })
        .unwrap();
    encoder.encode(&p()).unwrap();

    let messages = read(&encoder.into_inner());
    let ids: Vec<_> = messages
        .iter()
        .map(|m| match m {
            Message::Type { id, .. } => -id,
            Message::Value { id, .. } => *id,
        })
        .collect();
    // Line, Point and Vec<String> are described once, before the first value.
    assert_eq!(
        ids,
        vec![
            -FIRST_USER_ID,
            -(FIRST_USER_ID + 1),
            -(FIRST_USER_ID + 2),
            FIRST_USER_ID,
            FIRST_USER_ID + 1
        ]
    );
    assert_eq!(
        messages[2],
        Message::Type {
            id: FIRST_USER_ID + 2,
            wire_type: WireType::Slice {
                elem: Primitive::String.id()
            },
        }
    );
}

#[test]
fn recursive_type() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    let tree = Node {
        value: 1,
        children: vec![Node {
            value: 2,
            children: vec![],
        }],
    };
    encoder.encode(&tree).unwrap();

    let messages = read(&encoder.into_inner());
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[1],
        Message::Type {
            id: FIRST_USER_ID + 1,
            wire_type: WireType::Slice { elem: FIRST_USER_ID },
        }
    );
    let leaf = Value::Struct(vec![
        ("value".into(), Value::Uint(2)),
        ("children".into(), Value::Array(vec![])),
    ]);
    assert_eq!(
        messages[2],
        Message::Value {
            id: FIRST_USER_ID,
            value: Value::Struct(vec![
                ("value".into(), Value::Uint(1)),
                ("children".into(), Value::Array(vec![leaf])),
            ]),
        }
    );
}

#[test]
fn channel_fields_are_ignored() {
    init();
    let (tx, _rx) = std::sync::mpsc::channel();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&Job { id: 7, done: tx }).unwrap();

    let messages = read(&encoder.into_inner());
    assert_eq!(
        messages,
        vec![
            Message::Type {
                id: FIRST_USER_ID,
                wire_type: WireType::Struct {
                    name: "Job".into(),
                    fields: vec![plain("id", Primitive::U8)],
                },
            },
            Message::Value {
                id: FIRST_USER_ID,
                value: Value::Struct(vec![("id".into(), Value::Uint(7))]),
            },
        ]
    );
}

#[test]
fn skipped_fields_are_not_sent() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&Cached { key: 3, hits: 99 }).unwrap();

    let out = encoder.into_inner();
    // value message: len, id 64, key
    assert!(out.ends_with(&[4, 0xff, 0x80, 0, 3]));
    let messages = read(&out);
    assert!(matches!(
        &messages[0],
        Message::Type { wire_type: WireType::Struct { fields, .. }, .. } if fields.len() == 1
    ));
}

#[test]
fn tuple_struct_with_wire_name() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&Position(1, -1)).unwrap();

    let messages = read(&encoder.into_inner());
    assert_eq!(
        messages[0],
        Message::Type {
            id: FIRST_USER_ID,
            wire_type: WireType::Struct {
                name: "Pos".into(),
                fields: vec![plain("0", Primitive::U8), plain("1", Primitive::I8)],
            },
        }
    );
    assert_eq!(
        messages[1],
        Message::Value {
            id: FIRST_USER_ID,
            value: Value::Struct(vec![
                ("0".into(), Value::Uint(1)),
                ("1".into(), Value::Int(-1)),
            ]),
        }
    );
}

#[test]
fn generic_instances_are_distinct_types() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&Wrapper { inner: 1u8 }).unwrap();
    encoder.encode(&Wrapper { inner: 1u16 }).unwrap();
    encoder.encode(&Wrapper { inner: 2u8 }).unwrap();

    assert_eq!(encoder.type_id_of::<Wrapper<u8>>(), Some(FIRST_USER_ID));
    assert_eq!(encoder.type_id_of::<Wrapper<u16>>(), Some(FIRST_USER_ID + 1));
    assert_eq!(read(&encoder.into_inner()).len(), 5);
}

#[test]
fn external_types() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder
        .encode(&Peer {
            addr: Ipv4Addr::new(10, 0, 0, 1),
            timeout: Duration::from_secs(3),
        })
        .unwrap();

    let messages = read(&encoder.into_inner());
    assert_eq!(
        messages[1],
        Message::Type {
            id: FIRST_USER_ID + 1,
            wire_type: WireType::External {
                name: "Ipv4Addr".into()
            },
        }
    );
    assert_eq!(
        messages[3],
        Message::Value {
            id: FIRST_USER_ID,
            value: Value::Struct(vec![
                ("addr".into(), Value::External(vec![10, 0, 0, 1])),
                (
                    "timeout".into(),
                    Value::External(vec![0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0])
                ),
            ]),
        }
    );
}

#[test]
fn maps() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), 1u8);
    entries.insert("b".to_string(), 2u8);
    encoder.encode(&Lookup { entries }).unwrap();

    let messages = read(&encoder.into_inner());
    assert_eq!(
        messages[1],
        Message::Type {
            id: FIRST_USER_ID + 1,
            wire_type: WireType::Map {
                key: Primitive::String.id(),
                elem: Primitive::U8.id(),
            },
        }
    );
    let value = match &messages[2] {
        Message::Value { value, .. } => value,
        other => panic!("expected a value, got {:?}", other),
    };
    assert_eq!(
        value.field("entries"),
        Some(&Value::Map(vec![
            (Value::String("a".into()), Value::Uint(1)),
            (Value::String("b".into()), Value::Uint(2)),
        ]))
    );
}

#[test]
fn nil_field_fails_and_sticks() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&Maybe { value: Some(5) }).unwrap();
    let before = encoder.sink().len();

    let err = encoder.encode(&Maybe { value: None }).unwrap_err();
    assert!(matches!(err, EncodeError::InvalidValue(_)));
    let err = encoder.encode(&Maybe { value: Some(6) }).unwrap_err();
    assert!(matches!(err, EncodeError::InvalidValue(_)));
    assert_eq!(encoder.sink().len(), before);

    encoder.clear_error();
    encoder.encode(&Maybe { value: Some(6) }).unwrap();
    // No second descriptor after the failure.
    assert_eq!(read(&encoder.into_inner()).len(), 3);
}

#[test]
fn message_limit_is_exclusive() {
    init();
    // "abc" takes 5 bytes: id, count and content
    let config = Config::new().with_max_message_len(6);
    let encoder = Encoder::with_config(Vec::<u8>::new(), config);
    encoder.encode(&"abc".to_string()).unwrap();

    let err = encoder.encode(&"abcd".to_string()).unwrap_err();
    assert!(matches!(err, EncodeError::MessageTooLarge { len: 6, limit: 6 }));
    assert_eq!(encoder.into_inner(), vec![5, 24, 3, b'a', b'b', b'c']);
}

#[test]
fn primitives_enter_the_sent_set() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder.encode(&1u64).unwrap();
    encoder.encode(&vec![1u8, 2]).unwrap();
    assert_eq!(encoder.type_id_of::<u64>(), Some(Primitive::U64.id()));
    assert_eq!(encoder.type_id_of::<Vec<u8>>(), Some(Primitive::Bytes.id()));
    assert_eq!(encoder.sent_types(), 2);
    // Neither got a descriptor.
    assert!(read(&encoder.into_inner())
        .iter()
        .all(|m| matches!(m, Message::Value { .. })));
}

#[test]
fn concurrent_encodes_do_not_interleave() {
    init();
    let encoder = Arc::new(Encoder::new(Vec::<u8>::new()));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let encoder = encoder.clone();
            thread::spawn(move || {
                for j in 0..50 {
                    encoder
                        .encode(&Point {
                            x: i,
                            y: j,
                            label: "p".repeat(j as usize % 5),
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let encoder = match Arc::try_unwrap(encoder) {
        Ok(encoder) => encoder,
        Err(_) => panic!("encoder still shared"),
    };
    let messages = read(&encoder.into_inner());
    assert_eq!(messages.len(), 1 + 8 * 50);
    assert!(matches!(messages[0], Message::Type { .. }));
    assert!(messages[1..]
        .iter()
        .all(|m| matches!(m, Message::Value { id, .. } if *id == FIRST_USER_ID)));
}

#[derive(Encode)]
struct Boxed {
    point: Box<Point>,
    maybe: Option<Point>,
}

#[test]
fn pointer_fields_share_the_pointee_id() {
    init();
    let p = || Point {
        x: 1,
        y: 1,
        label: String::new(),
    };
    let encoder = Encoder::new(Vec::<u8>::new());
    encoder
        .encode(&Boxed {
            point: Box::new(p()),
            maybe: Some(p()),
        })
        .unwrap();
    encoder.encode(&p()).unwrap();

    let messages = read(&encoder.into_inner());
    let described: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Type { id, .. } => Some(*id),
            Message::Value { .. } => None,
        })
        .collect();
    assert_eq!(described, vec![FIRST_USER_ID, FIRST_USER_ID + 1]);
    assert_eq!(
        messages[0],
        Message::Type {
            id: FIRST_USER_ID,
            wire_type: WireType::Struct {
                name: "Boxed".into(),
                fields: vec![
                    WireField {
                        name: "point".into(),
                        ty: FIRST_USER_ID + 1,
                        tag: None,
                    },
                    WireField {
                        name: "maybe".into(),
                        ty: FIRST_USER_ID + 1,
                        tag: None,
                    },
                ],
            },
        }
    );
    assert!(matches!(messages.last(), Some(Message::Value { id, .. }) if *id == FIRST_USER_ID + 1));
}

/// Accepts `budget` messages, then fails every write.
struct Limited {
    out: Vec<u8>,
    budget: usize,
}

impl Sink for Limited {
    fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "full"));
        }
        self.budget -= 1;
        self.out.extend_from_slice(message);
        Ok(())
    }
}

#[derive(Encode)]
struct Parent {
    v: Vec<u16>,
}

#[test]
fn stream_stays_readable_after_failed_descriptor() {
    init();
    let encoder = Encoder::new(Limited {
        out: Vec::new(),
        budget: 1,
    });
    let err = encoder.encode(&Parent { v: vec![1] }).unwrap_err();
    assert!(matches!(err, EncodeError::SinkWrite(_)));

    encoder.sink().budget = usize::MAX;
    encoder.clear_error();
    encoder.encode(&Parent { v: vec![1, 2] }).unwrap();

    let messages = read(&encoder.into_inner().out);
    // Parent went out before the failure and is described again.
    assert_eq!(messages.len(), 4);
    assert_eq!(
        messages[3],
        Message::Value {
            id: FIRST_USER_ID,
            value: Value::Struct(vec![(
                "v".into(),
                Value::Array(vec![Value::Uint(1), Value::Uint(2)])
            )]),
        }
    );
}

#[derive(Encode)]
struct Chain {
    next: Vec<Chain>,
    #[structex(count_of = "tail")]
    n: u8,
    tail: u32,
}

#[derive(Encode)]
struct Good {
    items: Vec<u32>,
}

#[test]
fn malformed_type_leaves_no_trace() {
    init();
    let encoder = Encoder::new(Vec::<u8>::new());
    let err = encoder
        .encode(&Chain {
            next: vec![],
            n: 0,
            tail: 0,
        })
        .unwrap_err();
    assert!(matches!(err, EncodeError::MalformedTag { ty: "Chain", .. }));

    encoder.clear_error();
    encoder.encode(&Good { items: vec![3] }).unwrap();
    // Ids burnt by the failed type are handed out again.
    assert_eq!(encoder.type_id_of::<Good>(), Some(FIRST_USER_ID));

    let err = encoder
        .encode(&Chain {
            next: vec![],
            n: 0,
            tail: 0,
        })
        .unwrap_err();
    assert!(matches!(err, EncodeError::MalformedTag { .. }));

    let messages = read(&encoder.into_inner());
    assert_eq!(messages.len(), 3);
    assert!(matches!(messages[2], Message::Value { id, .. } if id == FIRST_USER_ID));
}
