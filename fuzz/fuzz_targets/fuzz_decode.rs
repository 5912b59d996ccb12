#![no_main]
use libfuzzer_sys::fuzz_target;
use savetrack::gvas::{Cursor, PropertyDecoder, SaveObject};

fuzz_target!(|data: &[u8]| {
    // Whole file decoding, with or without a header, must not panic
    let _ = SaveObject::from_slice(data);

    // Every property that decodes must leave the cursor at its declared end
    let mut cursor = Cursor::new(data);
    let mut decoder = PropertyDecoder::new();
    while let Ok(Some(property)) = decoder.decode_property(&mut cursor) {
        assert_eq!(cursor.position(), property.end_offset());
    }
});
