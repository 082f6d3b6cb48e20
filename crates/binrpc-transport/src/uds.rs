use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::TransportStream;

/// Unix domain stream socket transport.
///
/// Clients only ever need [`UnixDomainSocket::connect`]. The listening half
/// exists so local peers (test servers, protocol fixtures) can stand in for a
/// real control socket; the socket file is removed again on drop.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixDomainSocket {
    /// Maximum socket path length.
    /// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS and the BSDs.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<TransportStream> {
        let path = path.as_ref();
        Self::check_path_len(path)?;
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            endpoint: format!("unix:{}", path.display()),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(TransportStream::from_unix(stream))
    }

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// A stale socket file at `path` is removed first; any other kind of file
    /// is left alone and reported as a bind error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        Self::check_path_len(&path)?;

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        debug!(?path, "listening on unix domain socket");
        Ok(Self { listener, path })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TransportStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted connection");
        Ok(TransportStream::from_unix(stream))
    }

    fn check_path_len(path: &Path) -> Result<()> {
        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: Self::MAX_PATH_LEN,
            });
        }
        Ok(())
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket() {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("binrpc-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn request_and_reply_bytes_cross_the_socket() {
        let dir = temp_dir("uds");
        let sock_path = dir.join("ctl.sock");
        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let target = sock_path.clone();
        let caller = std::thread::spawn(move || {
            let mut stream = UnixDomainSocket::connect(&target).unwrap();
            stream.write_all(&[0xA1, 0x00, 0x00, 0x07]).unwrap();
            let mut reply = [0u8; 4];
            stream.read_exact(&mut reply).unwrap();
            reply
        });

        let mut server = listener.accept().unwrap();
        let mut request = [0u8; 4];
        server.read_exact(&mut request).unwrap();
        assert_eq!(request, [0xA1, 0x00, 0x00, 0x07]);
        server.write_all(&[0xA1, 0x10, 0x00, 0x07]).unwrap();

        assert_eq!(caller.join().unwrap(), [0xA1, 0x10, 0x00, 0x07]);

        drop(listener);
        assert!(!sock_path.exists(), "socket file removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn overlong_paths_rejected_on_both_sides() {
        let long_path = format!("/tmp/{}.sock", "k".repeat(200));
        assert!(matches!(
            UnixDomainSocket::bind(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
        assert!(matches!(
            UnixDomainSocket::connect(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("uds-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_replaces_stale_socket() {
        let dir = temp_dir("uds-stale");
        let sock_path = dir.join("stale.sock");

        let first = std::os::unix::net::UnixListener::bind(&sock_path).unwrap();
        drop(first);
        assert!(sock_path.exists());

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert_eq!(listener.path(), sock_path.as_path());

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let dir = temp_dir("uds-missing");
        let err = UnixDomainSocket::connect(dir.join("absent.sock")).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
