//! Character output on the Apple II text page.
//!
//! The page is 40 columns by 24 rows, in the interleaved Apple II layout.
//! Characters are stored with the high bit set (normal video).

use core::fmt;

pub const TEXT_PAGE_SIZE: usize = 2048;
pub const COLUMNS: usize = 40;
pub const ROWS: usize = 24;

/// Blank (space, normal video) in all four bytes
const BLANK: u32 = 0xA0A0_A0A0;
/// Bytes per text row, columns are two bytes apart
const ROW_BYTES: usize = 0x50;

/// Where diagnostics and menu echo go.
pub trait Console: fmt::Write {
    fn clear(&mut self);
    fn put_char(&mut self, c: u8);
}

impl<C: Console + ?Sized> Console for &mut C {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn put_char(&mut self, c: u8) {
        (**self).put_char(c)
    }
}

/// Byte and word access to the text page, addressed by offset.
pub trait TextMemory {
    fn write8(&mut self, offset: usize, value: u8);
    fn read32(&self, offset: usize) -> u32;
    fn write32(&mut self, offset: usize, value: u32);
}

/// The text page as mapped in the soft core address space.
pub struct TextPage {
    base: usize,
}

impl TextPage {
    /// # Safety
    ///
    /// `base` must point at [`TEXT_PAGE_SIZE`] bytes of text page memory.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl TextMemory for TextPage {
    fn write8(&mut self, offset: usize, value: u8) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u8, value) }
    }

    fn read32(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

/// Byte offset of a character cell.
pub fn cell_offset(x: usize, y: usize) -> usize {
    ROW_BYTES * (y >> 3) + ((y & 0x07) << 8) + (x << 1)
}

/// Teletype style screen with a cursor.
pub struct Screen<M> {
    memory: M,
    h: usize,
    v: usize,
}

impl<M> Screen<M> {
    pub const fn new(memory: M) -> Self {
        Self { memory, h: 0, v: 0 }
    }
}

impl<M: TextMemory> Screen<M> {
    pub fn cursor(&self) -> (usize, usize) {
        (self.h, self.v)
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn home(&mut self) {
        self.h = 0;
        self.v = 0;
    }

    /// Move rows 1..24 up one row and blank the last one.
    pub fn scroll(&mut self) {
        for y in 1..ROWS {
            let dst = cell_offset(0, y - 1);
            let src = cell_offset(0, y);
            for x in (0..ROW_BYTES).step_by(4) {
                let word = self.memory.read32(src + x);
                self.memory.write32(dst + x, word);
            }
        }
        let last = cell_offset(0, ROWS - 1);
        for x in (0..ROW_BYTES).step_by(4) {
            self.memory.write32(last + x, BLANK);
        }
        self.h = 0;
        self.v = ROWS - 1;
    }

    fn newline(&mut self) {
        self.h = 0;
        self.v += 1;
        if self.v >= ROWS {
            self.scroll();
        }
    }
}

impl<M: TextMemory> Console for Screen<M> {
    fn clear(&mut self) {
        for offset in (0..TEXT_PAGE_SIZE).step_by(4) {
            self.memory.write32(offset, BLANK);
        }
        self.home();
    }

    /// Control characters other than newline are dropped.
    fn put_char(&mut self, c: u8) {
        if c == b'\n' {
            return self.newline();
        }
        if c < 32 {
            return;
        }
        self.memory.write8(cell_offset(self.h, self.v), c.wrapping_add(128));
        self.h += 1;
        if self.h >= COLUMNS {
            self.newline();
        }
    }
}

impl<M: TextMemory> fmt::Write for Screen<M> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|c| self.put_char(c));
        Ok(())
    }
}
