/**
 * Serial line configuration for the GPS. The receiver streams NMEA text at a fixed baud rate;
 * the line is put in raw mode and reads are made non-blocking so that the control loop can poll
 * it.
 */
use enum_primitive::FromPrimitive;
use std::io::{Error, ErrorKind, Result};
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};


pub trait Termio {
    fn set_speed(&self, speed: Speed) -> Result<()>;
    fn get_speed(&self) -> Result<Speed>;
    /// No echo, no line editing, 8 data bits, receiver enabled.
    fn make_raw(&self) -> Result<()>;
    /// Reads return immediately with whatever is buffered, possibly nothing.
    fn set_non_blocking_read(&self) -> Result<()>;
    fn drop_input_output(&self) -> Result<()>;
}


impl<T> Termio for T where T: AsRawFd {
    fn set_speed(&self, speed: Speed) -> Result<()> {
        let fd = self.as_raw_fd();
        let mut config = get_attributes(fd)?;
        if unsafe { libc::cfsetspeed(&mut config, speed as libc::speed_t) } < 0 {
            return Err(Error::last_os_error());
        }
        set_attributes(fd, &config)
    }

    fn get_speed(&self) -> Result<Speed> {
        let config = get_attributes(self.as_raw_fd())?;
        let speed = unsafe { libc::cfgetospeed(&config) };
        match Speed::from_u64(speed as u64) {
            Some(speed) => Ok(speed),
            None => Err(Error::new(ErrorKind::InvalidData, format!("Unknown line speed {}", speed))),
        }
    }

    fn make_raw(&self) -> Result<()> {
        let fd = self.as_raw_fd();
        let mut config = get_attributes(fd)?;
        unsafe { libc::cfmakeraw(&mut config) };
        config.c_cflag |= libc::CLOCAL | libc::CREAD;
        set_attributes(fd, &config)
    }

    fn set_non_blocking_read(&self) -> Result<()> {
        let fd = self.as_raw_fd();
        let mut config = get_attributes(fd)?;
        config.c_cc[libc::VMIN] = 0;
        config.c_cc[libc::VTIME] = 0;
        set_attributes(fd, &config)
    }

    fn drop_input_output(&self) -> Result<()> {
        if unsafe { libc::tcflush(self.as_raw_fd(), libc::TCIOFLUSH) } < 0 {
            Err(Error::last_os_error())
        } else {
            Ok(())
        }
    }
}


fn get_attributes(fd: RawFd) -> Result<libc::termios> {
    let mut config: libc::termios = unsafe { mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut config) } < 0 {
        return Err(Error::last_os_error());
    }
    Ok(config)
}


fn set_attributes(fd: RawFd, config: &libc::termios) -> Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, config) } < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}


enum_from_primitive! {
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Speed {
    B1200 = libc::B1200 as isize,
    B2400 = libc::B2400 as isize,
    B4800 = libc::B4800 as isize,
    B9600 = libc::B9600 as isize,
    B19200 = libc::B19200 as isize,
    B38400 = libc::B38400 as isize,
    B57600 = libc::B57600 as isize,
    B115200 = libc::B115200 as isize,
    B230400 = libc::B230400 as isize
}
}


impl Speed {
    pub fn from_baud(baud: u32) -> Option<Speed> {
        match baud {
            1200 => Some(Speed::B1200),
            2400 => Some(Speed::B2400),
            4800 => Some(Speed::B4800),
            9600 => Some(Speed::B9600),
            19200 => Some(Speed::B19200),
            38400 => Some(Speed::B38400),
            57600 => Some(Speed::B57600),
            115200 => Some(Speed::B115200),
            230400 => Some(Speed::B230400),
            _ => None,
        }
    }
}
