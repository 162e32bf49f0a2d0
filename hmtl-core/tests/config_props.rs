//! Property tests for the descriptor table

use hmtl_core::config::{save, ConfigHeader, ConfigStore};
use hmtl_core::descriptor::{
    BusTransportOutput, OutputDescriptor, PixelStripOutput, ProgramOutput, RgbOutput,
    SensorArrayOutput, ValueOutput,
};
use hmtl_hal::RamStore;
use hmtl_protocol::{Payload, ProgramCommand};
use proptest::prelude::*;

fn descriptor_strategy() -> impl Strategy<Value = OutputDescriptor> {
    prop_oneof![
        (any::<u8>(), any::<u8>())
            .prop_map(|(pin, value)| OutputDescriptor::Value(ValueOutput { pin, value })),
        (any::<[u8; 3]>(), any::<[u8; 3]>())
            .prop_map(|(pins, values)| OutputDescriptor::Rgb(RgbOutput { pins, values })),
        any::<[u8; 12]>().prop_map(|values| OutputDescriptor::Program(ProgramOutput { values })),
        (any::<u16>(), any::<u8>(), any::<u8>(), any::<u8>()).prop_map(
            |(num_pixels, data_pin, clock_pin, strip_type)| {
                OutputDescriptor::PixelStrip(PixelStripOutput {
                    num_pixels,
                    data_pin,
                    clock_pin,
                    strip_type,
                })
            }
        ),
        (any::<u8>(), any::<bool>(), any::<[u8; 12]>()).prop_map(
            |(irq_pin, use_interrupt, thresholds)| {
                OutputDescriptor::CapacitiveSensorArray(SensorArrayOutput {
                    irq_pin,
                    use_interrupt,
                    thresholds,
                })
            }
        ),
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(recv_pin, xmit_pin, enable_pin)| {
            OutputDescriptor::BusTransportConfig(BusTransportOutput {
                recv_pin,
                xmit_pin,
                enable_pin,
            })
        }),
    ]
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop_oneof![
        any::<u8>().prop_map(|value| Payload::Value { value }),
        any::<[u8; 3]>().prop_map(|values| Payload::Rgb { values }),
        (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
            |(change_period, start_value, stop_value)| {
                Payload::Program(ProgramCommand::TimedChange {
                    change_period,
                    start_value,
                    stop_value,
                })
            }
        ),
        Just(Payload::Pixels),
        Just(Payload::Mpr121),
        Just(Payload::Rs485),
    ]
}

proptest! {
    #[test]
    fn saved_table_loads_back(
        address in any::<u16>(),
        master in any::<bool>(),
        outputs in proptest::collection::vec(descriptor_strategy(), 0..=16),
    ) {
        let mut header = ConfigHeader::new(address);
        header.set_master(master);

        let mut eeprom = RamStore::<512>::new();
        let end = save(&mut eeprom, &mut header, &outputs).unwrap();
        let expected_end = 7 + outputs.iter().map(|o| o.encoded_len()).sum::<usize>();
        prop_assert_eq!(end, expected_end);

        let config: ConfigStore = ConfigStore::load(&mut eeprom).unwrap();
        prop_assert_eq!(config.address(), address);
        prop_assert_eq!(config.is_master(), master);
        prop_assert_eq!(config.outputs(), outputs.as_slice());
    }

    #[test]
    fn apply_never_changes_tag_or_pins(
        descriptor in descriptor_strategy(),
        payload in payload_strategy(),
    ) {
        let mut updated = descriptor;
        match updated.apply_value(&payload) {
            Ok(_) => {
                prop_assert_eq!(updated.output_type(), descriptor.output_type());
                match (updated, descriptor) {
                    (OutputDescriptor::Value(a), OutputDescriptor::Value(b)) => {
                        prop_assert_eq!(a.pin, b.pin)
                    }
                    (OutputDescriptor::Rgb(a), OutputDescriptor::Rgb(b)) => {
                        prop_assert_eq!(a.pins, b.pins)
                    }
                    (OutputDescriptor::Program(_), _) => {}
                    (a, b) => prop_assert_eq!(a, b),
                }
            }
            Err(_) => prop_assert_eq!(updated, descriptor),
        }
    }
}
