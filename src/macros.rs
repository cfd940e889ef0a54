//
// Macros that build the box enum, the registry and the container boxes.
//

// Define all the boxes we know.
//
// def_boxes! {
//     TypeName, [ b"four", b"alt1" ] => module;
//     OtherType, [ b"oth1" ];
// }
//
// Builds the `MP4Box` enum, `From` impls for every variant, and the
// registry that maps a fourcc to the decoder of its type. A type can
// be registered under more than one fourcc.
macro_rules! def_boxes {
    ($($name:ident, [ $($fourcc:expr),+ ] $(=> $mod:ident)? ; )+) => {

        // include modules.
        $(
            $(
                pub(crate) mod $mod;
                pub use self::$mod::*;
            )?
        )+

        // build enum.
        impl_enum!(MP4Box, $($name, [ $($fourcc),+ ]),+);
    };
}

macro_rules! impl_enum {
    ($enum:ident, $($name:ident, [ $($fourcc:expr),+ ]),+) => {

        /// All the boxes we know.
        #[derive(Clone, Debug, PartialEq)]
        pub enum $enum {
            $(
                $name($name),
            )+
            GenericBox(GenericBox),
        }

        impl BoxInfo for $enum {
            fn fourcc(&self) -> FourCC {
                match self {
                    $(
                        $enum::$name(b) => b.fourcc(),
                    )+
                    $enum::GenericBox(b) => b.fourcc(),
                }
            }

            fn boxes(&self) -> Option<&[MP4Box]> {
                match self {
                    $(
                        $enum::$name(b) => b.boxes(),
                    )+
                    $enum::GenericBox(b) => b.boxes(),
                }
            }

            fn summary(&self) -> String {
                match self {
                    $(
                        $enum::$name(b) => b.summary(),
                    )+
                    $enum::GenericBox(b) => b.summary(),
                }
            }
        }

        impl $enum {
            /// Total size of the box, header included.
            pub fn size(&self) -> u64 {
                match self {
                    $(
                        $enum::$name(b) => b.size(),
                    )+
                    $enum::GenericBox(b) => b.size(),
                }
            }

            /// Write the box, header included.
            pub fn encode<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
                match self {
                    $(
                        $enum::$name(b) => b.encode(stream),
                    )+
                    $enum::GenericBox(b) => b.encode(stream),
                }
            }

            /// Encode the box into a new buffer.
            pub fn to_bytes(&self) -> Result<Vec<u8>> {
                let mut buf = Vec::with_capacity(self.size() as usize);
                self.encode(&mut buf)?;
                Ok(buf)
            }
        }

        $(
            impl From<$name> for $enum {
                fn from(b: $name) -> $enum {
                    $enum::$name(b)
                }
            }
        )+

        impl From<GenericBox> for $enum {
            fn from(b: GenericBox) -> $enum {
                $enum::GenericBox(b)
            }
        }

        /// Maps a fourcc to the decoder for its box type.
        pub(crate) static REGISTRY: Lazy<HashMap<FourCC, DecodeFn>> = Lazy::new(|| {
            let mut m: HashMap<FourCC, DecodeFn> = HashMap::new();
            $(
                $(
                    m.insert(FourCC(*$fourcc), decode_as::<$name>);
                )+
            )+
            m
        });
    };
}

// A plain container: a box that only holds other boxes.
macro_rules! container_box {
    ($(#[$outer:meta])* $name:ident, $fourcc:expr) => {
        $(#[$outer])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            pub boxes: Vec<MP4Box>,
        }

        impl $name {
            /// Append a child box.
            pub fn add_child(&mut self, child: impl Into<MP4Box>) {
                self.boxes.push(child.into());
            }
        }

        impl BoxInfo for $name {
            #[inline]
            fn fourcc(&self) -> FourCC {
                FourCC::new($fourcc)
            }
            fn boxes(&self) -> Option<&[MP4Box]> {
                Some(&self.boxes[..])
            }
        }

        impl BoxCodec for $name {
            fn decode(header: &BoxHeader, start: u64, stream: &mut SliceReader<'_>) -> Result<$name> {
                let boxes = decode_children(start + header.header_size(), start + header.size, stream)?;
                Ok($name { boxes })
            }

            fn payload_size(&self) -> u64 {
                children_size(&self.boxes)
            }

            fn encode_payload<W: WriteBytes>(&self, stream: &mut W) -> Result<()> {
                encode_children(&self.boxes, stream)
            }
        }
    };
}

/// Find the first box of type $type in $vec.
#[macro_export]
macro_rules! first_box {
    ($vec:expr, $type:ident) => {{
        let _x: Option<&$crate::boxes::$type> = $crate::iter_box!($vec, $type).next();
        _x
    }};
}

/// Find the first box of type $type in $vec, mutable.
#[macro_export]
macro_rules! first_box_mut {
    ($vec:expr, $type:ident) => {{
        let _x: Option<&mut $crate::boxes::$type> = $crate::iter_box_mut!($vec, $type).next();
        _x
    }};
}

/// Iterate over all boxes of type $type in $vec.
#[macro_export]
macro_rules! iter_box {
    ($vec:expr, $type:ident) => {
        $vec.iter().filter_map(|x| match x {
            &$crate::boxes::MP4Box::$type(ref b) => Some(b),
            _ => None,
        })
    };
}

/// Iterate over all boxes of type $type in $vec, mutable.
#[macro_export]
macro_rules! iter_box_mut {
    ($vec:expr, $type:ident) => {
        $vec.iter_mut().filter_map(|x| match x {
            &mut $crate::boxes::MP4Box::$type(ref mut b) => Some(b),
            _ => None,
        })
    };
}

/// Helper: typed accessors for a child box.
macro_rules! declare_box_methods {
    ($type:ident, $method:ident, $method_mut:ident) => {
        /// Get a reference to the child box of this type.
        pub fn $method(&self) -> Option<&$type> {
            first_box!(&self.boxes, $type)
        }
        /// Get a mutable reference to the child box of this type.
        pub fn $method_mut(&mut self) -> Option<&mut $type> {
            first_box_mut!(&mut self.boxes, $type)
        }
    };
}
