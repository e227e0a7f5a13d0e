//! Fakes shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_error::mci::MciError;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;

use crate::boot::{Board, Firmware};
use crate::bus::spi::SpiBus;
use crate::bus::SD_MMC_BLOCK_SIZE;
use crate::card::SdCard;
use crate::console::Console;
use crate::fs::{DirEntry, DiskIo, FileSystem, FsError, OpenMode, ReadTarget};
use crate::soc::cpu::{Cpu, IrqHandlerFn};
use crate::soc::gpio::StatusLed;
use crate::soc::host::HostBus;
use crate::soc::volume::{VolumePort, VolumeStatus};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Kind {
    Sdhc,
    SdscV2,
    SdV1,
    Mmc,
    /// Nothing in the slot
    Absent,
}

impl Kind {
    fn v2(self) -> bool {
        matches!(self, Kind::Sdhc | Kind::SdscV2)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Event {
    Select(bool),
    /// Byte out, byte in
    Transfer(u8, u8),
    /// The byte just exchanged was the start token of a data packet
    DataToken,
}

/// Deterministic content of a sector.
pub fn sector_pattern(sector: u32) -> Vec<u8> {
    (0..SD_MMC_BLOCK_SIZE as u32).map(|i| (i ^ sector.wrapping_mul(31)) as u8).collect()
}

enum Phase {
    Command,
    /// CMD24 accepted, waiting for the data token
    WriteToken(u32),
    WriteData(u32, Vec<u8>),
}

struct State {
    kind: Kind,
    ready_after: u32,
    check_pattern: u8,
    token_after: Option<u32>,
    busy_for: Option<u32>,
    data_response: u8,

    selected: bool,
    idle: bool,
    application: bool,
    polls: u32,
    frame: Vec<u8>,
    replies: VecDeque<(u8, bool)>,
    busy_forever: bool,
    pending_token: bool,
    phase: Phase,

    events: Vec<Event>,
    commands: Vec<[u8; 6]>,
    delays: Vec<u32>,
    reads: Vec<u32>,
    written: Vec<(u32, Vec<u8>)>,
    crc: Option<[u8; 2]>,
}

impl State {
    fn r1(&self) -> u8 {
        self.idle as u8
    }

    fn reply(&mut self, bytes: &[u8]) {
        // Ncr: one idle byte before any response
        self.replies.push_back((0xFF, false));
        self.replies.extend(bytes.iter().map(|&b| (b, false)));
    }

    fn poll_op_cond(&mut self) {
        self.polls = self.polls.saturating_add(1);
        if self.polls > self.ready_after {
            self.idle = false;
            self.reply(&[0x00]);
        } else {
            self.reply(&[0x01]);
        }
    }

    fn sector(&self, address: u32) -> u32 {
        match self.kind {
            Kind::Sdhc => address,
            _ => address / SD_MMC_BLOCK_SIZE as u32,
        }
    }

    fn command(&mut self, frame: [u8; 6]) {
        self.commands.push(frame);
        let index = frame[0] & 0x3F;
        let argument = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        let application = std::mem::replace(&mut self.application, false);
        match index {
            0 => {
                self.idle = true;
                self.polls = 0;
                self.reply(&[0x01]);
            }
            8 if self.kind.v2() => {
                let r1 = self.r1();
                self.reply(&[r1, 0x00, 0x00, 0x01, self.check_pattern]);
            }
            55 if self.kind != Kind::Mmc => {
                self.application = true;
                let r1 = self.r1();
                self.reply(&[r1]);
            }
            41 if application => self.poll_op_cond(),
            1 if self.kind == Kind::Mmc => self.poll_op_cond(),
            58 => {
                let r1 = self.r1();
                let ocr = if self.kind == Kind::Sdhc { 0xC0 } else { 0x80 };
                self.reply(&[r1, ocr, 0xFF, 0x80, 0x00]);
            }
            16 => {
                let r1 = self.r1();
                self.reply(&[r1]);
            }
            17 if !self.idle => {
                self.reads.push(argument);
                self.reply(&[0x00]);
                if let Some(filler) = self.token_after {
                    self.replies.extend((0..filler).map(|_| (0xFF, false)));
                    self.replies.push_back((0xFE, true));
                    let sector = self.sector(argument);
                    self.replies.extend(sector_pattern(sector).into_iter().map(|b| (b, false)));
                    self.replies.extend([(0x12, false), (0x34, false)].iter());
                }
            }
            24 if !self.idle => {
                self.reply(&[0x00]);
                self.phase = Phase::WriteToken(argument);
            }
            _ => self.reply(&[0x05]),
        }
    }

    fn next_reply(&mut self) -> u8 {
        match self.replies.pop_front() {
            Some((byte, token)) => {
                if token {
                    self.pending_token = true;
                }
                byte
            }
            None if self.busy_forever => 0x00,
            None => 0xFF,
        }
    }

    fn exchange(&mut self, out: u8) -> u8 {
        if !self.selected || self.kind == Kind::Absent {
            return 0xFF;
        }
        match std::mem::replace(&mut self.phase, Phase::Command) {
            Phase::Command => {
                if !self.frame.is_empty() || out & 0xC0 == 0x40 {
                    self.frame.push(out);
                    if self.frame.len() == 6 {
                        let mut frame = [0u8; 6];
                        frame.copy_from_slice(&self.frame);
                        self.frame.clear();
                        self.replies.clear();
                        self.command(frame);
                    }
                    return 0xFF;
                }
                self.next_reply()
            }
            Phase::WriteToken(address) => {
                if out == 0xFE {
                    self.phase = Phase::WriteData(address, Vec::with_capacity(514));
                    return 0xFF;
                }
                self.phase = Phase::WriteToken(address);
                self.next_reply()
            }
            Phase::WriteData(address, mut data) => {
                data.push(out);
                if data.len() < SD_MMC_BLOCK_SIZE + 2 {
                    self.phase = Phase::WriteData(address, data);
                    return 0xFF;
                }
                self.crc = Some([data[512], data[513]]);
                data.truncate(SD_MMC_BLOCK_SIZE);
                self.written.push((address, data));
                self.replies.push_back((self.data_response, false));
                if self.data_response & 0x1F == 0x05 {
                    match self.busy_for {
                        Some(n) => self.replies.extend((0..n).map(|_| (0x00, false))),
                        None => self.busy_forever = true,
                    }
                }
                0xFF
            }
        }
    }

    fn select(&mut self, selected: bool) {
        self.events.push(Event::Select(selected));
        self.selected = selected;
        if !selected {
            self.frame.clear();
            self.replies.clear();
            self.busy_forever = false;
            self.phase = Phase::Command;
        }
    }
}

/// Byte level SD card model behind an SPI bus and a chip select line.
///
/// Cloning shares the card, so a test keeps one handle for inspection while
/// the driver owns the bus.
#[derive(Clone)]
pub struct FakeCard(Rc<RefCell<State>>);

impl FakeCard {
    pub fn new(kind: Kind) -> Self {
        let state = State {
            kind,
            ready_after: 0,
            check_pattern: 0xAA,
            token_after: Some(0),
            busy_for: Some(0),
            data_response: 0x05,
            selected: false,
            idle: false,
            application: false,
            polls: 0,
            frame: Vec::new(),
            replies: VecDeque::new(),
            busy_forever: false,
            pending_token: false,
            phase: Phase::Command,
            events: Vec::new(),
            commands: Vec::new(),
            delays: Vec::new(),
            reads: Vec::new(),
            written: Vec::new(),
            crc: None,
        };
        Self(Rc::new(RefCell::new(state)))
    }

    /// Operating condition polls answered idle before the card is ready.
    pub fn ready_after(self, polls: u32) -> Self {
        self.0.borrow_mut().ready_after = polls;
        self
    }

    pub fn check_pattern(self, pattern: u8) -> Self {
        self.0.borrow_mut().check_pattern = pattern;
        self
    }

    /// Idle bytes before the read start token, `None` for never.
    pub fn token_after(self, filler: Option<u32>) -> Self {
        self.0.borrow_mut().token_after = filler;
        self
    }

    /// Busy bytes after an accepted write, `None` for stuck busy.
    pub fn busy_for(self, bytes: Option<u32>) -> Self {
        self.0.borrow_mut().busy_for = bytes;
        self
    }

    pub fn data_response(self, token: u8) -> Self {
        self.0.borrow_mut().data_response = token;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn commands(&self) -> Vec<[u8; 6]> {
        self.0.borrow().commands.clone()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.0.borrow().delays.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.0.borrow().events.iter().filter(|e| matches!(e, Event::Transfer(..))).count()
    }

    /// Addresses of accepted CMD17s.
    pub fn reads(&self) -> Vec<u32> {
        self.0.borrow().reads.clone()
    }

    pub fn written(&self) -> Vec<(u32, Vec<u8>)> {
        self.0.borrow().written.clone()
    }

    /// CRC bytes of the last written block.
    pub fn crc(&self) -> Option<[u8; 2]> {
        self.0.borrow().crc
    }

    /// Exchanges between the last start token and the following deselect.
    pub fn bytes_after_token(&self) -> usize {
        let state = self.0.borrow();
        let start = match state.events.iter().rposition(|e| *e == Event::DataToken) {
            Some(position) => position + 1,
            None => return 0,
        };
        state.events[start..]
            .iter()
            .take_while(|e| **e != Event::Select(false))
            .filter(|e| matches!(e, Event::Transfer(..)))
            .count()
    }

    pub fn clear_log(&self) {
        let mut state = self.0.borrow_mut();
        state.events.clear();
        state.commands.clear();
        state.delays.clear();
        state.reads.clear();
    }
}

pub struct FakeSpi(FakeCard);

impl spi::Transfer<u8> for FakeSpi {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Infallible> {
        let mut state = (self.0).0.borrow_mut();
        for word in words.iter_mut() {
            let out = *word;
            *word = state.exchange(out);
            state.events.push(Event::Transfer(out, *word));
            if std::mem::replace(&mut state.pending_token, false) {
                state.events.push(Event::DataToken);
            }
        }
        Ok(words)
    }
}

/// Active low chip select.
pub struct FakeCs(FakeCard);

impl OutputPin for FakeCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        (self.0).0.borrow_mut().select(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        (self.0).0.borrow_mut().select(false);
        Ok(())
    }
}

pub struct FakeDelay(FakeCard);

impl DelayUs<u32> for FakeDelay {
    fn delay_us(&mut self, us: u32) {
        (self.0).0.borrow_mut().delays.push(us);
    }
}

/// Unwrapping for card results, `MciError` does not implement `Debug`.
pub trait Checked<T> {
    fn checked(self) -> T;
}

impl<T> Checked<T> for Result<T, MciError> {
    fn checked(self) -> T {
        match self {
            Ok(value) => value,
            Err(_) => panic!("card error"),
        }
    }
}

pub type TestCard = SdCard<SpiBus<FakeSpi, FakeCs>, FakeDelay>;

pub fn card_on_bus(card: &FakeCard) -> TestCard {
    let bus = SpiBus::new(FakeSpi(card.clone()), FakeCs(card.clone()));
    SdCard::new(bus, FakeDelay(card.clone()))
}

struct FlatFile {
    name: &'static str,
    start: u32,
    size: usize,
    is_dir: bool,
}

pub struct FileHandle {
    index: usize,
    position: usize,
}

/// Filesystem with contiguous files at fixed sectors.
pub struct FlatFs<D> {
    disk: D,
    files: Vec<FlatFile>,
    mounted: bool,
}

pub type TestFs = FlatFs<TestCard>;

impl<D: DiskIo> FlatFs<D> {
    pub fn new(disk: D) -> Self {
        Self { disk, files: Vec::new(), mounted: false }
    }

    pub fn add_file(&mut self, name: &'static str, start: u32, size: usize) {
        self.files.push(FlatFile { name, start, size, is_dir: false });
    }

    pub fn add_dir(&mut self, name: &'static str) {
        self.files.push(FlatFile { name, start: 0, size: 0, is_dir: true });
    }
}

impl<D: DiskIo> FileSystem for FlatFs<D> {
    type File = FileHandle;
    type Dir = usize;

    fn mount(&mut self) -> Result<(), FsError> {
        self.disk.initialize().map_err(|_| FsError::NotReady)?;
        self.mounted = true;
        Ok(())
    }

    fn open(&mut self, name: &str, _mode: OpenMode) -> Result<FileHandle, FsError> {
        if !self.mounted {
            return Err(FsError::NotEnabled);
        }
        self.files
            .iter()
            .position(|f| !f.is_dir && f.name.eq_ignore_ascii_case(name))
            .map(|index| FileHandle { index, position: 0 })
            .ok_or(FsError::NoFile)
    }

    fn read(&mut self, file: &mut FileHandle, buffer: &mut [u8]) -> Result<usize, FsError> {
        let (start, size) = {
            let f = &self.files[file.index];
            (f.start, f.size)
        };
        let mut done = 0;
        while done < buffer.len() && file.position < size {
            let sector = start + (file.position / SD_MMC_BLOCK_SIZE) as u32;
            let offset = file.position % SD_MMC_BLOCK_SIZE;
            let count = (SD_MMC_BLOCK_SIZE - offset)
                .min(size - file.position)
                .min(buffer.len() - done);
            self.disk
                .read_partial(ReadTarget::Buffer(&mut buffer[done..done + count]), sector, offset)
                .map_err(|_| FsError::DiskErr)?;
            done += count;
            file.position += count;
        }
        Ok(done)
    }

    fn close(&mut self, _file: FileHandle) -> Result<(), FsError> {
        Ok(())
    }

    fn open_dir(&mut self, _path: &str) -> Result<usize, FsError> {
        if !self.mounted {
            return Err(FsError::NotEnabled);
        }
        Ok(0)
    }

    fn read_dir(&mut self, dir: &mut usize) -> Result<Option<DirEntry>, FsError> {
        let entry = self.files.get(*dir).map(|f| DirEntry::new(f.name, f.size as u64, f.is_dir));
        *dir += 1;
        Ok(entry)
    }
}

/// Panics after this many empty polls of a host latch.
const IDLE_POLL_LIMIT: u32 = 100_000;

#[derive(Default)]
pub struct FakeHost {
    pub keycodes: VecDeque<u8>,
    pub commands: VecDeque<u8>,
    pub resets: VecDeque<u8>,
    pub keycode_clears: u32,
    pub command_clears: u32,
    pub reset_clears: u32,
    pub video: bool,
    pub video_history: Vec<bool>,
    pub cardrom_active: bool,
    pub cardrom_releases: u32,
    pub bus_ready: bool,
    idle_polls: u32,
}

fn poll_latch(queue: &mut VecDeque<u8>, idle_polls: &mut u32) -> u8 {
    match queue.pop_front() {
        Some(value) => {
            *idle_polls = 0;
            value
        }
        None => {
            *idle_polls += 1;
            if *idle_polls > IDLE_POLL_LIMIT {
                panic!("host idle");
            }
            0
        }
    }
}

impl HostBus for FakeHost {
    fn keycode(&mut self) -> u8 {
        poll_latch(&mut self.keycodes, &mut self.idle_polls)
    }

    fn clear_keycode(&mut self) {
        self.keycode_clears += 1;
    }

    fn command(&mut self) -> u8 {
        poll_latch(&mut self.commands, &mut self.idle_polls)
    }

    fn clear_command(&mut self) {
        self.command_clears += 1;
    }

    fn reset(&mut self) -> u8 {
        poll_latch(&mut self.resets, &mut self.idle_polls)
    }

    fn clear_reset(&mut self) {
        self.reset_clears += 1;
    }

    fn video_enabled(&mut self) -> bool {
        self.video
    }

    fn set_video_enable(&mut self, enabled: bool) {
        self.video = enabled;
        self.video_history.push(enabled);
    }

    fn cardrom_active(&mut self) -> bool {
        self.cardrom_active
    }

    fn release_cardrom(&mut self) {
        self.cardrom_releases += 1;
    }

    fn set_bus_ready(&mut self) {
        self.bus_ready = true;
    }
}

#[derive(Default)]
pub struct FakeFirmware {
    pub commands: VecDeque<u8>,
}

impl Firmware for FakeFirmware {
    fn wait_for_cmd(&mut self) -> u8 {
        self.commands.pop_front().expect("no host command queued")
    }

    fn wait_for_char(&mut self) -> u8 {
        panic!("kernel reads keys through its own host bus")
    }

    fn wait_for_reset(&mut self) -> u8 {
        panic!("kernel waits for resets through its own host bus")
    }
}

#[derive(Default)]
pub struct FakeVolume {
    pub history: Vec<VolumeStatus>,
}

impl VolumePort for FakeVolume {
    fn publish(&mut self, status: &VolumeStatus) {
        self.history.push(*status);
    }
}

/// Console capturing text since the last clear.
#[derive(Default)]
pub struct Transcript {
    pub text: String,
    pub clears: u32,
}

impl std::fmt::Write for Transcript {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        s.bytes().for_each(|c| self.put_char(c));
        Ok(())
    }
}

impl Console for Transcript {
    fn clear(&mut self) {
        self.text.clear();
        self.clears += 1;
    }

    fn put_char(&mut self, c: u8) {
        self.text.push(c as char);
    }
}

pub struct FakeCpu {
    pub mask: u32,
    pub timer: Vec<u32>,
    pub handler: Option<IrqHandlerFn>,
    pub memory: std::collections::HashMap<u32, u16>,
}

impl Cpu for FakeCpu {
    fn mask_irq(&mut self, mask: u32) -> u32 {
        std::mem::replace(&mut self.mask, mask)
    }

    fn set_timer(&mut self, ticks: u32) -> u32 {
        self.timer.push(ticks);
        0
    }

    fn set_irq_handler(&mut self, handler: Option<IrqHandlerFn>) {
        self.handler = handler;
    }

    fn fetch_u16(&self, address: u32) -> u16 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn breakpoint(&mut self) -> ! {
        panic!("breakpoint")
    }
}

#[derive(Default)]
pub struct FakeLed {
    pub value: Option<u32>,
    pub toggles: u32,
    pub color: Option<u32>,
}

impl StatusLed for FakeLed {
    fn toggle(&mut self) {
        self.toggles += 1;
    }

    fn set(&mut self, value: u32) {
        self.value = Some(value);
    }

    fn set_color(&mut self, rgb: u32) {
        self.color = Some(rgb);
    }
}

#[derive(Default)]
pub struct FakeMsDelay(pub Vec<u32>);

impl DelayMs<u32> for FakeMsDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.push(ms);
    }
}

pub fn fake_board() -> Board<FakeCpu, FakeLed, FakeHost, Transcript, FakeMsDelay> {
    let cpu = FakeCpu {
        mask: 0xFFFF_FFFF,
        timer: Vec::new(),
        handler: None,
        memory: Default::default(),
    };
    Board {
        cpu,
        led: FakeLed::default(),
        host: FakeHost::default(),
        console: Transcript::default(),
        delay: FakeMsDelay::default(),
    }
}
