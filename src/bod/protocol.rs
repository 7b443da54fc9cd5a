//! Protocols sharing the radio and their per-BOD execution parameters

use crate::config::BB_PROT_NUM;
use crate::error::Error;

/// Radio protocol owning a BOD
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolId {
    /// Bluetooth Low Energy link layer
    Ble = 0,
    /// Bluetooth Low Energy direct test mode
    BleDtm = 1,
    /// PRBS15 continuous transmission
    Prbs15 = 2,
    /// IEEE 802.15.4 MAC
    Ieee802154 = 3,
}

impl ProtocolId {
    /// All protocols, ordered by their index
    pub const ALL: [ProtocolId; BB_PROT_NUM] = [
        ProtocolId::Ble,
        ProtocolId::BleDtm,
        ProtocolId::Prbs15,
        ProtocolId::Ieee802154,
    ];

    /// Index of this protocol in per-protocol tables
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for ProtocolId {
    type Error = Error;

    /// Maps a raw protocol number to a protocol
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bod::protocol::ProtocolId;
    /// use bb_sched::error::Error;
    ///
    /// assert_eq!(ProtocolId::try_from(3), Ok(ProtocolId::Ieee802154));
    /// assert_eq!(ProtocolId::try_from(4), Err(Error::InvalidProtocol));
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ProtocolId::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidProtocol)
    }
}

/// Physical layer used by a BLE operation
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlePhy {
    /// 1 Mbit/s
    #[default]
    Le1M,
    /// 2 Mbit/s
    Le2M,
    /// Coded, 125 kbit/s or 500 kbit/s
    LeCoded,
}

/// BLE RF channel configuration
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BleChannel {
    rf_channel: u8,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Access address of the packets
    pub access_address: u32,
    /// Initial value of the CRC
    pub crc_init: u32,
    /// Physical layer
    pub phy: BlePhy,
}

impl BleChannel {
    const MAX_RF_CHANNEL: u8 = 39;

    /// Creates channel parameters for an RF channel in range 0-39
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bod::protocol::BleChannel;
    /// use bb_sched::error::Error;
    ///
    /// let channel = BleChannel::new(12, 0x8e89_bed6, 0x55_5555).unwrap();
    /// assert_eq!(channel.frequency_mhz(), 2426);
    ///
    /// assert_eq!(BleChannel::new(40, 0, 0), Err(Error::InvalidChannel));
    /// ```
    pub fn new(rf_channel: u8, access_address: u32, crc_init: u32) -> Result<Self, Error> {
        if rf_channel > Self::MAX_RF_CHANNEL {
            return Err(Error::InvalidChannel);
        }

        Ok(Self {
            rf_channel,
            tx_power_dbm: 0,
            access_address,
            crc_init,
            phy: BlePhy::default(),
        })
    }

    /// RF channel number
    pub fn rf_channel(&self) -> u8 {
        self.rf_channel
    }

    /// Center frequency of the channel
    pub fn frequency_mhz(&self) -> u16 {
        2402 + u16::from(self.rf_channel) * 2
    }
}

/// Kind of work requested from the BLE link layer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleOpType {
    /// Advertising event
    Advertising,
    /// Scan window
    Scanning,
    /// Connection event as central
    CentralConnection,
    /// Connection event as peripheral
    PeripheralConnection,
    /// Test mode transmission or reception
    Test,
}

/// Execution parameters of a BLE operation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BleOp {
    /// RF channel configuration
    pub channel: BleChannel,
    /// Requested work
    pub op_type: BleOpType,
}

/// IEEE 802.15.4 channel in range 11-26
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ieee802154Channel(u8);

impl Ieee802154Channel {
    /// Creates a channel
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bod::protocol::Ieee802154Channel;
    /// use bb_sched::error::Error;
    ///
    /// let channel = Ieee802154Channel::new(11).unwrap();
    /// assert_eq!(channel.frequency_mhz(), 2405);
    ///
    /// assert_eq!(Ieee802154Channel::new(27), Err(Error::InvalidChannel));
    /// ```
    pub fn new(channel: u8) -> Result<Self, Error> {
        if (11..=26).contains(&channel) {
            Ok(Self(channel))
        } else {
            Err(Error::InvalidChannel)
        }
    }

    /// Channel number
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Center frequency of the channel
    pub fn frequency_mhz(&self) -> u16 {
        2405u16 + (self.0 - 11) as u16 * 5
    }
}

/// Kind of work requested from the IEEE 802.15.4 MAC
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ieee802154OpType {
    /// Frame reception
    Rx,
    /// Frame transmission
    Tx,
    /// Energy detection
    EnergyDetection,
    /// Clear channel assessment
    Cca,
}

/// Execution parameters of an IEEE 802.15.4 operation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ieee802154Op {
    /// Channel used by the operation
    pub channel: Ieee802154Channel,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Requested work
    pub op_type: Ieee802154OpType,
}

/// Execution parameters of a BOD, tagged with the protocol interpreting them
///
/// The protocol of a BOD is derived from the variant, so the parameters always match the handler
/// executing the BOD.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolData {
    /// Not assigned to any protocol. Such BODs cannot be scheduled.
    #[default]
    None,
    /// BLE link layer operation
    Ble(BleOp),
    /// BLE direct test mode operation
    BleDtm(BleOp),
    /// PRBS15 transmission on a BLE channel
    Prbs15(BleChannel),
    /// IEEE 802.15.4 operation
    Ieee802154(Ieee802154Op),
}

impl ProtocolData {
    /// Protocol owning these parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bod::protocol::{Ieee802154Channel, Ieee802154Op, Ieee802154OpType};
    /// use bb_sched::bod::protocol::{ProtocolData, ProtocolId};
    ///
    /// let data = ProtocolData::Ieee802154(Ieee802154Op {
    ///     channel: Ieee802154Channel::new(15).unwrap(),
    ///     tx_power_dbm: 0,
    ///     op_type: Ieee802154OpType::Rx,
    /// });
    /// assert_eq!(data.protocol_id(), Some(ProtocolId::Ieee802154));
    /// assert_eq!(ProtocolData::None.protocol_id(), None);
    /// ```
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        match self {
            ProtocolData::None => None,
            ProtocolData::Ble(_) => Some(ProtocolId::Ble),
            ProtocolData::BleDtm(_) => Some(ProtocolId::BleDtm),
            ProtocolData::Prbs15(_) => Some(ProtocolId::Prbs15),
            ProtocolData::Ieee802154(_) => Some(ProtocolId::Ieee802154),
        }
    }
}
