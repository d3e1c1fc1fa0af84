use beacon154_frame::*;
use colored::*;

struct Writer<'b> {
    buffer: &'b mut String,
    indent: usize,
}

impl<'b> Writer<'b> {
    fn new(buffer: &'b mut String) -> Self {
        Self { buffer, indent: 0 }
    }

    fn increase_indent(&mut self) {
        self.indent += 2;
    }

    fn decrease_indent(&mut self) {
        self.indent -= 2;
    }

    fn write(&mut self, s: String) {
        self.buffer.push_str(&" ".repeat(self.indent));
        self.buffer.push_str(&s);
    }

    fn writeln(&mut self, s: String) {
        self.write(s);
        self.buffer.push('\n');
    }

    fn section(&mut self, title: &str) {
        self.writeln(title.underline().bold().to_string());
    }

    fn field(&mut self, name: &str, value: impl core::fmt::Display) {
        self.writeln(format!("{}: {}", name.bold(), value));
    }
}

fn flag(value: bool) -> usize {
    value as usize
}

fn address(addr: Address) -> String {
    format!(
        "{}{}",
        addr,
        if addr.is_broadcast() {
            " (broadcast)"
        } else {
            ""
        }
    )
}

pub struct FrameParser {}

impl FrameParser {
    pub fn parse_hex(input: &str) -> Result<String> {
        let data = hex::decode(input).map_err(|_| Error)?;
        Self::parse(&data)
    }

    pub fn parse(input: &[u8]) -> Result<String> {
        let frame = Frame::new(input)?;
        let mut buffer = String::new();

        let mut w = Writer::new(&mut buffer);

        let fc = frame.frame_control();

        // -----------------------------------------------------------------
        // Frame Control
        // -----------------------------------------------------------------
        w.section("Frame Control");
        w.increase_indent();
        w.field(
            "frame type",
            format!(
                "{}{:?}",
                if fc.frame_version() == FrameVersion::Ieee802154_2020
                    && fc.frame_type() == FrameType::Beacon
                {
                    "Enhanced "
                } else {
                    ""
                },
                fc.frame_type()
            )
            .bright_blue(),
        );
        w.field("security", flag(fc.security_enabled()));
        w.field("frame pending", flag(fc.frame_pending()));
        w.field("ack request", flag(fc.ack_request()));
        w.field("pan id compression", flag(fc.pan_id_compression()));
        w.field(
            "sequence number suppression",
            flag(fc.sequence_number_suppression()),
        );
        w.field(
            "information elements present",
            flag(fc.information_elements_present()),
        );
        w.field(
            "dst addressing mode",
            format!("{:?}", fc.dst_addressing_mode()),
        );
        w.field(
            "src addressing mode",
            format!("{:?}", fc.src_addressing_mode()),
        );
        w.field(
            "frame version",
            format!("{} ({:?})", fc.frame_version() as usize, fc.frame_version()),
        );
        w.decrease_indent();

        // -----------------------------------------------------------------
        // Sequence Number
        // -----------------------------------------------------------------
        if let Some(seq) = frame.sequence_number() {
            w.section("Sequence Number");
            w.increase_indent();
            w.field("sequence number", seq);
            w.decrease_indent();
        }

        // -----------------------------------------------------------------
        // Addressing
        // -----------------------------------------------------------------
        if let Some(addr) = frame.addressing() {
            w.section("Addressing");
            w.increase_indent();
            if let Some(dst_pan_id) = addr.dst_pan_id() {
                w.field("dst pan id", format!("{:x}", dst_pan_id));
            }
            if !addr.dst_address().is_empty() {
                w.field("dst addr", address(addr.dst_address()));
            }
            if let Some(src_pan_id) = addr.src_pan_id() {
                w.field("src pan id", format!("{:x}", src_pan_id));
            }
            if !addr.src_address().is_empty() {
                w.field("src addr", address(addr.src_address()));
            }
            w.decrease_indent();
        }

        // -----------------------------------------------------------------
        // Auxiliary Security Header
        // -----------------------------------------------------------------
        if let Some(aux) = frame.auxiliary_security_header() {
            w.section("Auxiliary Security Header");
            w.increase_indent();
            w.field("security level", format!("{:?}", aux.security_level()));
            w.field("key id mode", format!("{:?}", aux.key_id_mode()));
            if let Some(counter) = aux.frame_counter() {
                w.field("frame counter", counter);
            }
            if !aux.key_source().is_empty() {
                w.field("key source", format!("{:02x?}", aux.key_source()));
            }
            if let Some(index) = aux.key_index() {
                w.field("key index", index);
            }
            w.decrease_indent();
        }

        // -----------------------------------------------------------------
        // Information Elements
        // -----------------------------------------------------------------
        let ies = frame.information_elements()?;
        if !ies.is_empty() {
            w.section("Information Elements");

            if !ies.header.is_empty() {
                w.increase_indent();
                w.writeln(format!("{}", "Header Information Elements".italic()));
                w.increase_indent();
                for ie in &ies.header {
                    w.writeln(format!(
                        "{}({:02x?})",
                        format!("{:?}", ie.element_id()).bold(),
                        ie.content
                    ));
                }
                w.decrease_indent();
                w.decrease_indent();
            }

            if !ies.payload.is_empty() {
                w.increase_indent();
                w.writeln(format!("{}", "Payload Information Elements".italic()));
                for ie in &ies.payload {
                    w.increase_indent();
                    match ie.group() {
                        PayloadGroupId::Mlme => {
                            w.writeln("MLME".to_string());
                            w.increase_indent();
                            for nested in ie.sub_ies() {
                                w.writeln(format!("{nested}"));
                            }
                            w.decrease_indent();
                        }
                        id => w.writeln(format!("{}({:02x?})", format!("{:?}", id).bold(), ie.content)),
                    }
                    w.decrease_indent();
                }
                w.decrease_indent();
            }
        }

        // -----------------------------------------------------------------
        // MAC payload
        // -----------------------------------------------------------------
        let payload = frame.payload();
        match fc.frame_type() {
            FrameType::Beacon => {
                let beacon = BeaconPayload::new(payload)?;
                let sf = beacon.superframe_specification();
                w.section("Superframe Specification");
                w.increase_indent();
                w.field("beacon order", sf.beacon_order());
                w.field("superframe order", sf.superframe_order());
                w.field("final cap slot", sf.final_cap_slot());
                w.field("battery life extension", flag(sf.battery_life_extension()));
                w.field("pan coordinator", flag(sf.pan_coordinator()));
                w.field("association permit", flag(sf.association_permit()));
                w.decrease_indent();

                w.section("GTS");
                w.increase_indent();
                w.field("permit", flag(beacon.gts_specification().gts_permit()));
                w.decrease_indent();

                if beacon.pending_addresses().next().is_some() {
                    w.section("Pending Addresses");
                    w.increase_indent();
                    for pending in beacon.pending_addresses() {
                        w.writeln(format!("{pending}"));
                    }
                    w.decrease_indent();
                }

                if !beacon.beacon_payload().is_empty() {
                    w.section("Beacon Payload");
                    w.increase_indent();
                    w.writeln(format!("{:02x?}", beacon.beacon_payload()));
                    w.decrease_indent();
                }
            }
            FrameType::MacCommand if !fc.security_enabled() => {
                let cmd = MacCommand::new(payload)?;
                w.section("Command");
                w.increase_indent();
                w.field("command", format!("{:?}", cmd.command_id()).bright_blue());
                match CommandRepr::parse(&cmd) {
                    Some(CommandRepr::AssociationRequest { .. }) => {
                        let cap = CapabilityInformation::new(cmd.content())?;
                        w.field(
                            "alternate pan coordinator",
                            flag(cap.alternate_pan_coordinator()),
                        );
                        w.field("full function device", flag(cap.device_type()));
                        w.field("mains powered", flag(cap.power_source()));
                        w.field("rx on when idle", flag(cap.receiver_on_when_idle()));
                        w.field("security", flag(cap.security_capability()));
                        w.field("allocate address", flag(cap.allocate_address()));
                    }
                    Some(CommandRepr::AssociationResponse {
                        short_address,
                        status,
                    }) => {
                        w.field("short address", format!("{:04x}", short_address));
                        w.field("status", status);
                    }
                    Some(CommandRepr::DisassociationNotification { reason }) => {
                        w.field("reason", reason);
                    }
                    Some(CommandRepr::CoordinatorRealignment {
                        pan_id,
                        coordinator_short_address,
                        channel,
                        short_address,
                        channel_page,
                    }) => {
                        w.field("pan id", format!("{:x}", pan_id));
                        w.field(
                            "coordinator short address",
                            format!("{:04x}", coordinator_short_address),
                        );
                        w.field("channel", channel);
                        w.field("short address", format!("{:04x}", short_address));
                        if let Some(page) = channel_page {
                            w.field("channel page", page);
                        }
                    }
                    _ => {}
                }
                w.decrease_indent();
            }
            _ if !payload.is_empty() => {
                w.section("Payload");
                w.increase_indent();
                w.writeln(format!("{:02x?}", payload));
                w.decrease_indent();
            }
            _ => {}
        }

        Ok(buffer)
    }
}
