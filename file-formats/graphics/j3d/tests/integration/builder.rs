//! Synthetic J3D containers assembled byte by byte

/// A tag under construction; offsets are tag-relative like the real format
pub struct Section {
    id: [u8; 4],
    bytes: Vec<u8>,
}

impl Section {
    pub fn new(id: &[u8; 4]) -> Self {
        Self {
            id: *id,
            bytes: vec![0; 8],
        }
    }

    pub fn offset(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn align(&mut self, to: usize) -> &mut Self {
        while self.bytes.len() % to != 0 {
            self.bytes.push(0);
        }
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn raw(&mut self, v: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(v);
        self
    }

    /// Overwrite a u32 written earlier, typically an offset placeholder
    pub fn patch_u32(&mut self, at: u32, v: u32) -> &mut Self {
        let at = at as usize;
        self.bytes[at..at + 4].copy_from_slice(&v.to_be_bytes());
        self
    }

    /// Patch the placeholder at `at` with the current offset
    pub fn mark(&mut self, at: u32) -> &mut Self {
        let here = self.offset();
        self.patch_u32(at, here)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align(4);
        let size = self.bytes.len() as u32;
        self.bytes[0..4].copy_from_slice(&self.id);
        self.bytes[4..8].copy_from_slice(&size.to_be_bytes());
        self.bytes
    }
}

/// Wrap finished tags in a container header
pub fn container(tags: &[Vec<u8>]) -> Vec<u8> {
    let body: usize = tags.iter().map(Vec::len).sum();
    let mut data = Vec::new();
    data.extend_from_slice(b"J3D2bmd3");
    data.extend_from_slice(&((0x20 + body) as u32).to_be_bytes());
    data.extend_from_slice(&(tags.len() as u32).to_be_bytes());
    data.extend_from_slice(&[0xFF; 16]);
    for tag in tags {
        data.extend_from_slice(tag);
    }
    data
}

/// INF1 from raw `(kind, value)` hierarchy entries
pub fn inf1(entries: &[(u16, u16)]) -> Vec<u8> {
    let mut s = Section::new(b"INF1");
    s.u16(0).u16(0xFFFF).u32(1).u32(0).u32(0);
    s.mark(0x14);
    for &(kind, value) in entries {
        s.u16(kind).u16(value);
    }
    s.u16(0).u16(0);
    s.finish()
}

/// VTX1 with a single float position array
pub fn vtx1(positions: &[[f32; 3]]) -> Vec<u8> {
    let mut s = Section::new(b"VTX1");
    s.u32(0);
    for _ in 0..13 {
        s.u32(0);
    }
    s.mark(0x08);
    // position: xyz, f32
    s.u32(9).u32(1).u32(4).u8(0).raw(&[0xFF; 3]);
    s.u32(0xFF).u32(0).u32(0).u8(0).raw(&[0xFF; 3]);
    s.mark(0x0C);
    for p in positions {
        s.f32(p[0]).f32(p[1]).f32(p[2]);
    }
    s.finish()
}

/// JNT1 with identity-rotation, unit-scale joints at the given translations
pub fn jnt1(translations: &[[f32; 3]]) -> Vec<u8> {
    let mut s = Section::new(b"JNT1");
    s.u16(translations.len() as u16).u16(0xFFFF).u32(0).u32(0).u32(0);
    s.mark(0x0C);
    for t in translations {
        s.u16(0).u8(1).u8(0xFF);
        s.f32(1.0).f32(1.0).f32(1.0);
        s.i16(0).i16(0).i16(0).u16(0xFFFF);
        s.f32(t[0]).f32(t[1]).f32(t[2]);
        s.f32(1.0);
        for v in [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0] {
            s.f32(v);
        }
    }
    s.mark(0x10);
    for i in 0..translations.len() {
        s.u16(i as u16);
    }
    s.finish()
}

/// EVP1 from `(bone, weight)` lists and row-major 3x4 inverse bind matrices
pub fn evp1(envelopes: &[&[(u16, f32)]], inverse_bind: &[[[f32; 4]; 3]]) -> Vec<u8> {
    let mut s = Section::new(b"EVP1");
    s.u16(envelopes.len() as u16).u16(0xFFFF).u32(0).u32(0).u32(0).u32(0);
    s.mark(0x0C);
    for e in envelopes {
        s.u8(e.len() as u8);
    }
    s.align(2).mark(0x10);
    for e in envelopes {
        for &(bone, _) in e.iter() {
            s.u16(bone);
        }
    }
    s.align(4).mark(0x14);
    for e in envelopes {
        for &(_, weight) in e.iter() {
            s.f32(weight);
        }
    }
    s.mark(0x18);
    for m in inverse_bind {
        for row in m {
            for &v in row {
                s.f32(v);
            }
        }
    }
    s.finish()
}

/// DRW1 from `(weighted, index)` slots
pub fn drw1(slots: &[(bool, u16)]) -> Vec<u8> {
    let mut s = Section::new(b"DRW1");
    s.u16(slots.len() as u16).u16(0xFFFF).u32(0).u32(0);
    s.mark(0x0C);
    for &(weighted, _) in slots {
        s.u8(weighted as u8);
    }
    s.align(2).mark(0x10);
    for &(_, index) in slots {
        s.u16(index);
    }
    s.finish()
}

pub const STRIP: u8 = 0x98;
pub const FAN: u8 = 0xA0;
pub const TRIANGLES: u8 = 0x90;
pub const QUADS: u8 = 0x80;

/// One packet: a matrix table and primitives of `(skin slot, position)` vertices
pub struct PacketSpec {
    pub matrix_table: Vec<u16>,
    pub primitives: Vec<(u8, Vec<(u8, u16)>)>,
}

/// SHP1 whose shapes use a direct position-matrix index and 16-bit positions
pub fn shp1(shapes: &[Vec<PacketSpec>]) -> Vec<u8> {
    let mut s = Section::new(b"SHP1");
    s.u16(shapes.len() as u16).u16(0xFFFF);
    for _ in 0..8 {
        s.u32(0);
    }

    // Shape records, patched below once the packet tables are laid out.
    s.mark(0x0C);
    let records = s.offset();
    let mut first_packet = 0u16;
    for packets in shapes {
        s.u8(3).u8(0xFF).u16(packets.len() as u16);
        s.u16(0).u16(first_packet).u16(first_packet).u16(0xFFFF);
        s.f32(2.0);
        for v in [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0] {
            s.f32(v);
        }
        first_packet += packets.len() as u16;
    }
    debug_assert_eq!(s.offset() - records, shapes.len() as u32 * 0x28);

    s.mark(0x10);
    for i in 0..shapes.len() {
        s.u16(i as u16);
    }

    s.align(4).mark(0x18);
    s.u32(0).u32(1); // position matrix index, direct
    s.u32(9).u32(3); // position, index16
    s.u32(0xFF).u32(0);

    s.mark(0x1C);
    let mut first_index = 0u32;
    let mut matrix_data = Vec::new();
    for packet in shapes.iter().flatten() {
        for &v in &packet.matrix_table {
            s.u16(v);
        }
        matrix_data.push((packet.matrix_table.len() as u16, first_index));
        first_index += packet.matrix_table.len() as u32;
    }

    s.align(32).mark(0x20);
    let primitive_base = s.offset();
    let mut locations = Vec::new();
    for packet in shapes.iter().flatten() {
        let start = s.offset();
        for (opcode, vertices) in &packet.primitives {
            s.u8(*opcode).u16(vertices.len() as u16);
            for &(slot, position) in vertices {
                s.u8(slot * 3).u16(position);
            }
        }
        s.align(32);
        locations.push((s.offset() - start, start - primitive_base));
    }

    s.mark(0x24);
    for (count, first) in matrix_data {
        s.u16(0).u16(count).u32(first);
    }

    s.mark(0x28);
    for (size, offset) in locations {
        s.u32(size).u32(offset);
    }
    s.finish()
}

/// MAT3 with one material and one channel whose color and alpha share
/// the given control record
pub fn mat3(name: &str, control: [u8; 6]) -> Vec<u8> {
    let mut s = Section::new(b"MAT3");
    s.u16(1).u16(0xFFFF);
    for _ in 0..30 {
        s.u32(0);
    }
    let section = |i: u32| 0x0C + i * 4;

    s.mark(section(0));
    let mut entry = vec![0xFFu8; 0x14C];
    entry[0x02] = 0;
    for at in [0x0C, 0x0E] {
        entry[at..at + 2].copy_from_slice(&0u16.to_be_bytes());
    }
    s.raw(&entry);

    s.align(4).mark(section(1));
    s.u16(0);

    s.align(4).mark(section(2));
    s.u16(1).u16(0xFFFF).u16(0).u16(8);
    s.raw(name.as_bytes()).u8(0);

    s.align(4).mark(section(6));
    s.u8(1);

    s.align(4).mark(section(7));
    s.raw(&control).u16(0xFFFF);
    s.finish()
}
