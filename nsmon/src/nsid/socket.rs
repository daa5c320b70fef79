use std::{
	io,
	mem::{size_of, size_of_val, zeroed},
	os::fd::{AsRawFd, FromRawFd, OwnedFd},
};

use tokio::io::{unix::AsyncFd, Interest};
use tracing::{debug, warn};

use super::{nsid_from_control, parse_notifications, NotificationSource, NsId, NsidNotification};
use crate::{Error, Result};

const RECV_BUF_LEN: usize = 8192;
// Room for a handful of cmsghdr + int entries, in words so `cmsghdr` reads are aligned.
const CONTROL_WORDS: usize = 8;

/// Everything one receive call produced. The ancillary id is already copied out.
#[derive(Debug, Clone, Default)]
pub struct NsidBatch {
	pub nsid: Option<NsId>,
	pub notifications: Vec<NsidNotification>,
}

/// Multicast subscription to the rtnetlink NSID group.
pub struct NsidSocket {
	fd: AsyncFd<OwnedFd>,
	body: Box<[u8; RECV_BUF_LEN]>,
	control: [u64; CONTROL_WORDS],
}

impl NsidSocket {
	/// Opens, binds and subscribes the socket. Any failing step is fatal to startup.
	pub fn open() -> Result<Self> {
		let raw = unsafe {
			libc::socket(
				libc::AF_NETLINK,
				libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
				libc::NETLINK_ROUTE,
			)
		};
		if raw < 0 {
			return Err(Error::setup("socket")(io::Error::last_os_error()));
		}
		let fd = unsafe { OwnedFd::from_raw_fd(raw) };

		let mut addr: libc::sockaddr_nl = unsafe { zeroed() };
		addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
		let ret = unsafe {
			libc::bind(
				fd.as_raw_fd(),
				&addr as *const libc::sockaddr_nl as *const libc::sockaddr,
				size_of::<libc::sockaddr_nl>() as libc::socklen_t,
			)
		};
		if ret < 0 {
			return Err(Error::setup("bind")(io::Error::last_os_error()));
		}

		set_netlink_opt(&fd, libc::NETLINK_ADD_MEMBERSHIP, libc::RTNLGRP_NSID as libc::c_int)
			.map_err(Error::setup("NETLINK_ADD_MEMBERSHIP"))?;
		set_netlink_opt(&fd, libc::NETLINK_LISTEN_ALL_NSID, 1).map_err(Error::setup("NETLINK_LISTEN_ALL_NSID"))?;

		let fd = AsyncFd::with_interest(fd, Interest::READABLE).map_err(Error::setup("register"))?;

		Ok(NsidSocket {
			fd,
			body: Box::new([0u8; RECV_BUF_LEN]),
			control: [0u64; CONTROL_WORDS],
		})
	}
}

impl NotificationSource for NsidSocket {
	/// Waits for the next datagram and decodes it.
	///
	/// The ancillary NSID only lives in this call's control buffer, which the next call
	/// overwrites, so it is copied into the returned batch before returning.
	async fn receive(&mut self) -> Result<NsidBatch> {
		loop {
			let mut guard = self.fd.readable().await?;

			let res = guard.try_io(|fd| recv_with_control(fd.as_raw_fd(), &mut self.body[..], &mut self.control));
			let (body_len, nsid, flags) = match res {
				Ok(Ok(received)) => received,
				Ok(Err(e)) if e.raw_os_error() == Some(libc::ENOBUFS) => {
					warn!("NSID socket overrun, notifications were lost");
					continue;
				}
				Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
				Ok(Err(e)) => return Err(e.into()),
				Err(_would_block) => continue,
			};

			if flags & libc::MSG_TRUNC != 0 {
				warn!("NSID datagram truncated to {body_len} bytes");
			}

			let notifications = parse_notifications(&self.body[..body_len], nsid);
			return Ok(NsidBatch { nsid, notifications });
		}
	}
}

fn set_netlink_opt(fd: &OwnedFd, opt: libc::c_int, value: libc::c_int) -> io::Result<()> {
	let ret = unsafe {
		libc::setsockopt(
			fd.as_raw_fd(),
			libc::SOL_NETLINK,
			opt,
			&value as *const libc::c_int as *const libc::c_void,
			size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if ret < 0 {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}

/// One `recvmsg` call. Returns body length, the ancillary NSID and message flags.
///
/// The NSID is read before returning, while `control` still holds this call's data.
fn recv_with_control(
	fd: libc::c_int,
	body: &mut [u8],
	control: &mut [u64],
) -> io::Result<(usize, Option<NsId>, libc::c_int)> {
	let mut iov = libc::iovec {
		iov_base: body.as_mut_ptr() as *mut libc::c_void,
		iov_len: body.len(),
	};
	let mut addr: libc::sockaddr_nl = unsafe { zeroed() };

	let mut msg: libc::msghdr = unsafe { zeroed() };
	msg.msg_name = &mut addr as *mut libc::sockaddr_nl as *mut libc::c_void;
	msg.msg_namelen = size_of::<libc::sockaddr_nl>() as libc::socklen_t;
	msg.msg_iov = &mut iov;
	msg.msg_iovlen = 1;
	msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;
	msg.msg_controllen = size_of_val(control) as _;

	let n = unsafe { libc::recvmsg(fd, &mut msg, 0) };
	if n < 0 {
		return Err(io::Error::last_os_error());
	}

	let body_len = (n as usize).min(body.len());
	let nsid = if msg.msg_flags & libc::MSG_CTRUNC != 0 {
		debug!("NSID control data truncated, id unknown");
		None
	} else {
		nsid_from_control(&msg)
	};
	Ok((body_len, nsid, msg.msg_flags))
}
