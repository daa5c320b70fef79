//! Decoding of rtnetlink NSID datagrams and their control messages.

use std::{mem::size_of, ptr};

use netlink_packet_core::{NetlinkBuffer, NetlinkMessage, NetlinkPayload};
use netlink_packet_route::{
	nsid::{NsidAttribute, NsidMessage},
	RouteNetlinkMessage,
};
use tracing::debug;

use super::{NsId, NsidChange, NsidNotification};

fn nlmsg_align(len: usize) -> usize {
	(len + 3) & !3
}

/// Finds the NSID the kernel attached as `NETLINK_LISTEN_ALL_NSID` ancillary data.
///
/// `msg` is the header of a completed `recvmsg` call, so `msg_controllen` covers only
/// the filled part of its control buffer. A negative id (NETNSA_NSID_NOT_ASSIGNED)
/// counts as unknown.
pub fn nsid_from_control(msg: &libc::msghdr) -> Option<NsId> {
	if msg.msg_control.is_null() {
		return None;
	}
	let end = msg.msg_control as usize + msg.msg_controllen as usize;
	let data_len = size_of::<libc::c_int>();

	let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(msg) };
	while !cmsg.is_null() {
		// CMSG_FIRSTHDR does not check the first entry's length against the buffer.
		let cmsg_len = unsafe { (*cmsg).cmsg_len } as usize;
		if cmsg_len < size_of::<libc::cmsghdr>() || cmsg as usize + cmsg_len > end {
			return None;
		}

		let (level, kind) = unsafe { ((*cmsg).cmsg_level, (*cmsg).cmsg_type) };
		if level == libc::SOL_NETLINK
			&& kind == libc::NETLINK_LISTEN_ALL_NSID
			&& cmsg_len >= unsafe { libc::CMSG_LEN(data_len as libc::c_uint) } as usize
		{
			let id = unsafe { ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const libc::c_int) };
			return u32::try_from(id).ok();
		}

		cmsg = unsafe { libc::CMSG_NXTHDR(msg, cmsg) };
	}

	None
}

/// Decodes the NSID notifications of one datagram. Other message types are skipped.
///
/// `nsid` is the id copied out of the same receive call's control data.
pub fn parse_notifications(body: &[u8], nsid: Option<NsId>) -> Vec<NsidNotification> {
	let mut out = Vec::new();
	let mut offset = 0;

	while offset < body.len() {
		let (msg_len, msg_type) = match NetlinkBuffer::new_checked(&body[offset..]) {
			Ok(buf) => (buf.length() as usize, buf.message_type()),
			Err(e) => {
				debug!("malformed netlink header at offset {offset} ({e}), dropping rest of datagram");
				break;
			}
		};
		let msg = &body[offset..offset + msg_len];
		offset += nlmsg_align(msg_len);

		if msg_type != libc::RTM_NEWNSID && msg_type != libc::RTM_DELNSID {
			continue;
		}

		match NetlinkMessage::<RouteNetlinkMessage>::deserialize(msg) {
			Ok(NetlinkMessage {
				payload: NetlinkPayload::InnerMessage(inner),
				..
			}) => {
				let (change, attributes) = match inner {
					RouteNetlinkMessage::NewNsId(NsidMessage { attributes, .. }) => (NsidChange::Assigned, attributes),
					RouteNetlinkMessage::DelNsId(NsidMessage { attributes, .. }) => (NsidChange::Removed, attributes),
					_ => continue,
				};
				out.push(NsidNotification {
					change,
					nsid,
					body_nsid: body_nsid(attributes),
				});
			}
			Ok(_) => {}
			Err(e) => debug!("undecodable NSID message of type {msg_type}: {e}"),
		}
	}

	out
}

fn body_nsid(attributes: Vec<NsidAttribute>) -> Option<i32> {
	attributes.into_iter().find_map(|attr| match attr {
		NsidAttribute::Id(id) => (id >= 0).then_some(id),
		_ => None,
	})
}

// region:    --- Tests


// endregion: --- Tests
