use bitflags::bitflags;

bitflags! {
    /// Flags selecting which observation fields must be present for a row to survive
    /// preprocessing. Rows missing any required field are dropped before windowing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequiredField: u32 {
        const TEMPERATURE       = 1 << 0;
        const RELATIVE_HUMIDITY = 1 << 1;
        const PRESSURE          = 1 << 2;
        const WIND_SPEED        = 1 << 3;
        const CLOUD_FRACTION    = 1 << 4;
        const PRECIPITATION     = 1 << 5;

        /// Every field except precipitation, which is zero-filled instead.
        const STANDARD = Self::TEMPERATURE.bits()
                       | Self::RELATIVE_HUMIDITY.bits()
                       | Self::PRESSURE.bits()
                       | Self::WIND_SPEED.bits()
                       | Self::CLOUD_FRACTION.bits();

        const ALL = Self::STANDARD.bits() | Self::PRECIPITATION.bits();

        const NONE = 0;
    }
}

impl Default for RequiredField {
    fn default() -> Self {
        RequiredField::STANDARD
    }
}
