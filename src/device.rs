//! Device discovery and session management for FT4222H devices.

use bitflags::bitflags;
use log::{debug, info, trace, warn};
use nusb::MaybeFuture;

use crate::consts;
use crate::error::{Error, Result};
use crate::gpio::GpioState;
use crate::spi_master::SpiMode;
use crate::spi_slave::SpiSlaveState;
use crate::transport::{strip_modem_status, Transport, UsbTransport};

/// System clock of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SysClock {
    /// 60 MHz (power-on default).
    #[default]
    Clk60 = 0,
    /// 24 MHz.
    Clk24 = 1,
    /// 48 MHz.
    Clk48 = 2,
    /// 80 MHz.
    Clk80 = 3,
}

impl SysClock {
    /// Get the frequency in kHz
    pub fn to_khz(self) -> u32 {
        match self {
            SysClock::Clk60 => 60_000,
            SysClock::Clk24 => 24_000,
            SysClock::Clk48 => 48_000,
            SysClock::Clk80 => 80_000,
        }
    }
}

impl TryFrom<u8> for SysClock {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SysClock::Clk60),
            1 => Ok(SysClock::Clk24),
            2 => Ok(SysClock::Clk48),
            3 => Ok(SysClock::Clk80),
            v => Err(Error::ArgumentOutOfRange(format!("System clock {}", v))),
        }
    }
}

/// Chip mode selected by the DCNF pins. Determines the interface layout and
/// how many SPI slave-select lines exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl ChipMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ChipMode::Mode0),
            1 => Some(ChipMode::Mode1),
            2 => Some(ChipMode::Mode2),
            3 => Some(ChipMode::Mode3),
            _ => None,
        }
    }

    /// Number of SPI master slave-select lines.
    pub fn cs_channels(self) -> u8 {
        match self {
            ChipMode::Mode0 => 1,
            ChipMode::Mode1 => 3,
            ChipMode::Mode2 => 4,
            ChipMode::Mode3 => 1,
        }
    }
}

/// Chip and firmware revision, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub chip_version: u32,
    pub firmware_version: u32,
    pub build: u32,
}

impl Version {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < consts::info::VERSION_LEN as usize {
            return Err(Error::InvalidResponse(format!(
                "Version response too short: {} < {}",
                data.len(),
                consts::info::VERSION_LEN
            )));
        }
        let word = |i: usize| u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
        Ok(Self {
            chip_version: word(0),
            firmware_version: word(4),
            build: word(8),
        })
    }
}

/// Chip variant, derived from the number of interfaces it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Mode 0: two interfaces.
    Ft4222H0,
    /// Mode 1 or 2: four interfaces.
    Ft4222H1_2,
    /// Mode 3: a single interface.
    Ft4222H3,
    Unknown,
}

impl DeviceType {
    fn from_interface_count(count: usize) -> Self {
        match count {
            1 => DeviceType::Ft4222H3,
            2 => DeviceType::Ft4222H0,
            4 => DeviceType::Ft4222H1_2,
            _ => DeviceType::Unknown,
        }
    }
}

bitflags! {
    /// Flags of an enumerated interface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceFlags: u32 {
        /// Device runs at USB high speed.
        const HISPEED = 0x02;
    }
}

/// Information about one interface of a discovered FT4222H.
///
/// Every FT4222H interface is listed separately. On chips with more than one
/// interface the serial number and description carry the interface letter
/// (`"FT4222 A"`, `"FT4222 B"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the enumeration order.
    pub index: usize,
    pub flags: DeviceFlags,
    pub device_type: DeviceType,
    /// `vid << 16 | pid`.
    pub id: u32,
    /// `bus << 16 | address << 8 | interface`. Stable while the device stays plugged in.
    pub location: u32,
    pub serial_number: String,
    pub description: String,
    /// USB interface number this entry refers to.
    pub interface_number: u8,
    /// USB bus number.
    pub bus: u8,
    /// USB device address on the bus.
    pub address: u8,
}

impl DeviceInfo {
    /// wIndex used for configuration requests to this interface.
    pub fn control_index(&self) -> u16 {
        if self.device_type == DeviceType::Ft4222H3 {
            0
        } else {
            self.interface_number as u16 + 1
        }
    }
}

/// One FT4222H as seen on the bus, before it is split into per-interface entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct UsbRecord {
    pub(crate) bus: u8,
    pub(crate) address: u8,
    pub(crate) hispeed: bool,
    pub(crate) serial_number: Option<String>,
    pub(crate) product: Option<String>,
    pub(crate) interfaces: Vec<u8>,
}

/// Expands bus records into interface entries ordered by (bus, address, interface).
pub(crate) fn expand_records(mut records: Vec<UsbRecord>) -> Vec<DeviceInfo> {
    records.sort_by_key(|r| (r.bus, r.address));
    let mut list = Vec::new();

    for mut record in records {
        record.interfaces.sort_unstable();
        let device_type = DeviceType::from_interface_count(record.interfaces.len());
        let multi = record.interfaces.len() > 1;
        let serial = record.serial_number.unwrap_or_default();
        let product = record.product.unwrap_or_else(|| "FT4222".to_string());
        let flags = if record.hispeed {
            DeviceFlags::HISPEED
        } else {
            DeviceFlags::empty()
        };

        for (n, &interface_number) in record.interfaces.iter().enumerate() {
            let (serial_number, description) = if multi {
                let letter = (b'A' + n as u8) as char;
                (format!("{}{}", serial, letter), format!("{} {}", product, letter))
            } else {
                (serial.clone(), product.clone())
            };
            list.push(DeviceInfo {
                index: list.len(),
                flags,
                device_type,
                id: ((consts::FTDI_VID as u32) << 16) | consts::FT4222H_PID as u32,
                location: ((record.bus as u32) << 16)
                    | ((record.address as u32) << 8)
                    | interface_number as u32,
                serial_number,
                description,
                interface_number,
                bus: record.bus,
                address: record.address,
            });
        }
    }
    list
}

/// Bus number used in `DeviceInfo::bus` and the location id.
#[cfg(target_os = "linux")]
fn bus_number(d: &nusb::DeviceInfo) -> u8 {
    d.busnum()
}

/// Bus number used in `DeviceInfo::bus` and the location id.
///
/// Only Linux reports a numeric bus. Elsewhere the platform bus id is used
/// when it is a small decimal number, otherwise it is folded into one byte.
#[cfg(not(target_os = "linux"))]
fn bus_number(d: &nusb::DeviceInfo) -> u8 {
    bus_number_from_id(d.bus_id())
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
fn bus_number_from_id(bus_id: &str) -> u8 {
    bus_id.parse::<u8>().unwrap_or_else(|_| {
        // FNV-1a, reduced to a byte
        let hash = bus_id
            .bytes()
            .fold(0x811C_9DC5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
        (hash ^ (hash >> 8) ^ (hash >> 16) ^ (hash >> 24)) as u8
    })
}

fn list_usb_records() -> Result<Vec<UsbRecord>> {
    let records = nusb::list_devices()
        .wait()?
        .filter(|d| d.vendor_id() == consts::FTDI_VID && d.product_id() == consts::FT4222H_PID)
        .map(|d| {
            debug!(
                "Found FT4222H at bus {} address {}, SN={:?}",
                d.bus_id(),
                d.device_address(),
                d.serial_number()
            );
            UsbRecord {
                bus: bus_number(&d),
                address: d.device_address(),
                hispeed: matches!(
                    d.speed(),
                    Some(nusb::Speed::High | nusb::Speed::Super | nusb::Speed::SuperPlus)
                ),
                serial_number: d.serial_number().map(str::to_string),
                product: d.product_string().map(str::to_string),
                interfaces: d
                    .interfaces()
                    .filter(|i| i.class() == consts::VENDOR_CLASS)
                    .map(|i| i.interface_number())
                    .collect(),
            }
        })
        .collect();
    Ok(records)
}

/// Finds every FT4222H interface on the system.
pub fn find_all() -> Result<Vec<DeviceInfo>> {
    Ok(expand_records(list_usb_records()?))
}

/// Snapshot of the FT4222H interfaces present when it was created.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    devices: Vec<DeviceInfo>,
}

impl DeviceList {
    /// Enumerates the bus.
    pub fn create() -> Result<Self> {
        Ok(Self {
            devices: find_all()?,
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Details of the interface at `index`.
    pub fn detail(&self, index: usize) -> Result<&DeviceInfo> {
        self.devices.get(index).ok_or(Error::DeviceNotFoundByIndex {
            index,
            count: self.devices.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter()
    }

    /// Re-enumerates the bus, replacing the snapshot.
    pub fn refresh(&mut self) -> Result<usize> {
        self.devices = find_all()?;
        Ok(self.devices.len())
    }
}

impl IntoIterator for DeviceList {
    type Item = DeviceInfo;
    type IntoIter = std::vec::IntoIter<DeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

/// Returns the number of FT4222H interfaces currently attached.
pub fn create_device_info_list() -> Result<usize> {
    Ok(find_all()?.len())
}

/// Returns the details of the interface at `index`.
///
/// No list is kept between calls, so the bus is enumerated every time and
/// `update` only affects logging.
pub fn get_device_info_detail(index: usize, update: bool) -> Result<DeviceInfo> {
    if update {
        debug!("Refreshing device list for index {}", index);
    }
    let list = DeviceList::create()?;
    list.detail(index).cloned()
}

/// Function the chip is currently configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Function {
    #[default]
    None,
    I2cMaster,
    SpiMaster,
    SpiSlave,
    Gpio,
}

impl Function {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::None => "No function",
            Function::I2cMaster => "I2C master",
            Function::SpiMaster => "SPI master",
            Function::SpiSlave => "SPI slave",
            Function::Gpio => "GPIO",
        }
    }
}

/// A handle to an opened FT4222H interface.
/// **Note:** This handle is not thread-safe (`!Send`, `!Sync`).
#[derive(Debug)]
pub struct Ft4222 {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) info: Option<DeviceInfo>,
    pub(crate) control_index: u16,
    pub(crate) chip_mode: ChipMode,
    pub(crate) sys_clock: SysClock,
    pub(crate) function: Function,
    pub(crate) spi_lines: SpiMode,
    /// Dual or quad width used by multi-I/O transfers.
    pub(crate) spi_multi_lines: SpiMode,
    pub(crate) gpio: GpioState,
    pub(crate) spi_slave: SpiSlaveState,
}

impl Ft4222 {
    // --- Constructors and Info ---

    /// Opens the interface described by `info`. Recommended method.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        let usb_info = nusb::list_devices()
            .wait()?
            .find(|d| {
                d.vendor_id() == consts::FTDI_VID
                    && d.product_id() == consts::FT4222H_PID
                    && bus_number(&d) == info.bus
                    && d.device_address() == info.address
            })
            .ok_or(Error::DeviceNotFoundByLocation {
                location: info.location,
            })?;

        info!(
            "Opening FT4222H {} at bus {} address {} interface {}",
            info.description, info.bus, info.address, info.interface_number
        );
        let device = usb_info
            .open()
            .wait()
            .map_err(|e| Error::OpenFailed(e.to_string()))?;

        let config_desc = device
            .active_configuration()
            .map_err(|e| Error::OpenFailed(format!("Failed to get config: {}", e)))?;

        let mut in_ep: Option<u8> = None;
        let mut out_ep: Option<u8> = None;
        for iface in config_desc
            .interface_alt_settings()
            .filter(|i| i.interface_number() == info.interface_number)
        {
            for ep in iface.endpoints() {
                if ep.transfer_type() == nusb::descriptors::TransferType::Bulk {
                    if ep.direction() == nusb::transfer::Direction::In {
                        in_ep = Some(ep.address());
                    } else {
                        out_ep = Some(ep.address());
                    }
                }
            }
        }
        let in_ep =
            in_ep.ok_or_else(|| Error::OpenFailed("Could not find IN endpoint".to_string()))?;
        let out_ep =
            out_ep.ok_or_else(|| Error::OpenFailed("Could not find OUT endpoint".to_string()))?;
        debug!(
            "Using interface {}, IN EP 0x{:02X}, OUT EP 0x{:02X}",
            info.interface_number, in_ep, out_ep
        );

        let interface = device
            .claim_interface(info.interface_number)
            .wait()
            .map_err(|e| Error::OpenFailed(format!("Failed to claim interface: {}", e)))?;
        let transport = UsbTransport::new(interface, in_ep, out_ep)?;

        Self::from_transport(Box::new(transport), Some(info.clone()))
    }

    /// Opens the first interface found. **Warning:** Ambiguous if multiple devices exist.
    pub fn open_first() -> Result<Self> {
        let info = find_all()?
            .into_iter()
            .next()
            .ok_or(Error::DeviceNotFound)?;
        Self::open(&info)
    }

    /// Opens an interface by its index in the enumeration order.
    pub fn open_by_index(index: usize) -> Result<Self> {
        let list = DeviceList::create()?;
        Self::open(list.detail(index)?)
    }

    /// Opens an interface by serial number (including the interface letter on multi-interface chips).
    pub fn open_by_serial(serial: &str) -> Result<Self> {
        let info = find_all()?
            .into_iter()
            .find(|d| d.serial_number == serial)
            .ok_or_else(|| Error::DeviceNotFoundBySerial {
                serial: serial.to_string(),
            })?;
        Self::open(&info)
    }

    /// Opens an interface by description, e.g. `"FT4222 A"`.
    pub fn open_by_description(description: &str) -> Result<Self> {
        let info = find_all()?
            .into_iter()
            .find(|d| d.description == description)
            .ok_or_else(|| Error::DeviceNotFoundByDescription {
                description: description.to_string(),
            })?;
        Self::open(&info)
    }

    /// Opens an interface by its location id.
    pub fn open_by_location(location: u32) -> Result<Self> {
        let info = find_all()?
            .into_iter()
            .find(|d| d.location == location)
            .ok_or(Error::DeviceNotFoundByLocation { location })?;
        Self::open(&info)
    }

    /// Creates a session on top of an existing transport.
    ///
    /// Reads the chip mode and version. Without `info` the control index is 0,
    /// as on single-interface chips.
    pub fn from_transport(transport: Box<dyn Transport>, info: Option<DeviceInfo>) -> Result<Self> {
        let control_index = info.as_ref().map_or(0, DeviceInfo::control_index);
        let mut device = Self {
            transport,
            info,
            control_index,
            chip_mode: ChipMode::Mode0,
            sys_clock: SysClock::default(),
            function: Function::None,
            spi_lines: SpiMode::None,
            spi_multi_lines: SpiMode::None,
            gpio: GpioState::default(),
            spi_slave: SpiSlaveState::default(),
        };

        let config = device.info_request(consts::info::GET_CONFIG, consts::info::CONFIG_LEN)?;
        let raw_mode = *config
            .first()
            .ok_or_else(|| Error::InvalidResponse("Empty response for config".into()))?;
        device.chip_mode = ChipMode::from_raw(raw_mode).ok_or_else(|| {
            Error::InvalidResponse(format!("Unknown mode byte: 0x{:02x}", raw_mode))
        })?;

        let version = device.get_version()?;
        info!(
            "FT4222H version: chip=0x{:08X} firmware=0x{:08X} build=0x{:08X}, {:?} ({} CS lines)",
            version.chip_version,
            version.firmware_version,
            version.build,
            device.chip_mode,
            device.chip_mode.cs_channels()
        );
        Ok(device)
    }

    /// Information the session was opened with, if any.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Reads the chip and firmware version.
    pub fn get_version(&mut self) -> Result<Version> {
        let data = self.info_request(consts::info::GET_VERSION, consts::info::VERSION_LEN)?;
        Version::parse(&data)
    }

    /// Chip mode read when the session was opened.
    pub fn chip_mode(&self) -> ChipMode {
        self.chip_mode
    }

    /// Sets the system clock. I2C and SPI clocks derive from it.
    pub fn set_clock(&mut self, clock: SysClock) -> Result<()> {
        debug!("Setting system clock to {:?}", clock);
        self.config_request(consts::config::SET_CLOCK, clock as u8)?;
        self.sys_clock = clock;
        Ok(())
    }

    /// Current system clock as last set through this session.
    pub fn get_clock(&self) -> SysClock {
        self.sys_clock
    }

    /// Resets the whole chip. The session must be reopened afterwards.
    pub fn chip_reset(&mut self) -> Result<()> {
        info!("Resetting FT4222H chip");
        self.reset_request(consts::reset::CHIP)
    }

    /// Discards data buffered in the chip. Failures are logged and ignored.
    pub fn flush(&mut self) {
        for _ in 0..consts::OUTPUT_FLUSH_COUNT {
            if let Err(e) = self.reset_request(consts::reset::OUTPUT_FLUSH) {
                warn!("Output flush failed: {}", e);
            }
        }
        if let Err(e) = self.reset_request(consts::reset::INPUT_FLUSH) {
            warn!("Input flush failed: {}", e);
        }
    }

    /// Returns the chip to no function and clears host-side function state.
    /// The P2/P3 suspend-out and wake-up roles are kept.
    pub fn uninitialize(&mut self) -> Result<()> {
        debug!("Uninitializing {}", self.function.name());
        self.config_request(consts::config::SET_MODE, consts::function::NONE)?;
        self.function = Function::None;
        self.spi_lines = SpiMode::None;
        self.spi_multi_lines = SpiMode::None;
        self.gpio = GpioState {
            suspend_out: self.gpio.suspend_out,
            wakeup_interrupt: self.gpio.wakeup_interrupt,
            ..GpioState::default()
        };
        self.spi_slave = SpiSlaveState::default();
        Ok(())
    }

    /// Largest payload one bulk IN packet carries.
    pub fn max_transfer_size(&self) -> usize {
        self.transport
            .max_packet_size()
            .saturating_sub(consts::MODEM_STATUS_SIZE)
    }

    // --- Control requests ---
    pub(crate) fn config_request(&mut self, cmd: u8, data: u8) -> Result<()> {
        let value = ((data as u16) << 8) | cmd as u16;
        trace!("Config 0x{:02X} = 0x{:02X}", cmd, data);
        self.transport
            .control_out(consts::REQUEST_CONFIG, value, self.control_index, &[])
    }

    pub(crate) fn info_request(&mut self, value: u16, len: u16) -> Result<Vec<u8>> {
        self.transport
            .control_in(consts::REQUEST_INFO, value, self.control_index, len)
    }

    pub(crate) fn reset_request(&mut self, value: u16) -> Result<()> {
        self.transport.control_out(consts::REQUEST_RESET, value, 0, &[])
    }

    pub(crate) fn require(&self, function: Function) -> Result<()> {
        if self.function == function {
            Ok(())
        } else {
            Err(Error::NotInitialized {
                function: function.name(),
            })
        }
    }

    /// Reads exactly `len` payload bytes, skipping modem-status bytes.
    pub(crate) fn read_payload(&mut self, len: usize) -> Result<Vec<u8>> {
        let packet = self.transport.max_packet_size();
        let mut result = Vec::with_capacity(len);
        let mut empty_reads = 0;

        while result.len() < len {
            let remaining = len - result.len();
            let request_len =
                std::cmp::min(remaining + consts::MODEM_STATUS_SIZE, consts::READ_BUFFER_SIZE);
            let raw = self.transport.bulk_read(request_len)?;
            let payload = strip_modem_status(&raw, packet);
            if payload.is_empty() {
                empty_reads += 1;
                if empty_reads >= consts::MAX_EMPTY_READS {
                    warn!("No data after {} reads ({} of {} bytes)", empty_reads, result.len(), len);
                    return Err(Error::Timeout);
                }
                continue;
            }
            empty_reads = 0;
            let to_copy = std::cmp::min(payload.len(), remaining);
            result.extend_from_slice(&payload[..to_copy]);
        }

        trace!("Bulk read {} bytes", result.len());
        Ok(result)
    }
}
