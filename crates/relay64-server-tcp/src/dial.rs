use tokio::net::TcpStream;

/// Open a TCP connection to `address` (an IP literal without brackets) on `port`
///
/// The address may carry a `%zone` suffix; it is resolved by the system
/// resolver in that case, which understands interface names.
pub async fn dial(address: &str, port: u16) -> std::io::Result<TcpStream> {
    TcpStream::connect((address, port)).await
}
