use crate::packet::Cookie;

/// Produces a fresh cookie for every request.
///
/// Any generator works as long as concurrent requests on one stream don't
/// share a cookie. Closures returning a [`Cookie`] implement this too.
pub trait CookieSource {
    fn next_cookie(&mut self) -> Cookie;
}

/// Draws cookies from the thread-local random generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCookies;

impl CookieSource for RandomCookies {
    fn next_cookie(&mut self) -> Cookie {
        Cookie::new(rand::random())
    }
}

/// Hands out consecutive cookies, wrapping at `u32::MAX`.
#[derive(Debug, Default, Clone)]
pub struct SequentialCookies {
    next: u32,
}

impl SequentialCookies {
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }
}

impl CookieSource for SequentialCookies {
    fn next_cookie(&mut self) -> Cookie {
        let cookie = Cookie::new(self.next);
        self.next = self.next.wrapping_add(1);
        cookie
    }
}

impl<F: FnMut() -> Cookie> CookieSource for F {
    fn next_cookie(&mut self) -> Cookie {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_cookies_increment_and_wrap() {
        let mut cookies = SequentialCookies::starting_at(u32::MAX - 1);
        assert_eq!(cookies.next_cookie(), Cookie::new(u32::MAX - 1));
        assert_eq!(cookies.next_cookie(), Cookie::new(u32::MAX));
        assert_eq!(cookies.next_cookie(), Cookie::new(0));
    }

    #[test]
    fn random_cookies_vary() {
        let mut cookies = RandomCookies;
        let drawn: std::collections::HashSet<Cookie> =
            (0..16).map(|_| cookies.next_cookie()).collect();
        assert!(drawn.len() > 1);
    }

    #[test]
    fn closures_are_cookie_sources() {
        let mut source = || Cookie::new(42);
        assert_eq!(source.next_cookie(), Cookie::new(42));
    }
}
