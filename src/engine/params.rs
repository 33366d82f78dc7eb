use std::iter::{DoubleEndedIterator, ExactSizeIterator, FusedIterator};
use std::str::FromStr;

/// Path parameters of the matched route, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    list: Vec<(String, String)>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.list
            .iter()
            .find_map(|(n, v)| if n == name { Some(v.as_str()) } else { None })
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(T::from_str)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.list.iter(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.list.push((name.into(), value.into()));
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = IntoIter;
    fn into_iter(self) -> IntoIter {
        IntoIter {
            inner: self.list.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, String)>,
}

pub struct IntoIter {
    inner: std::vec::IntoIter<(String, String)>,
}

macro_rules! delegate {
    (iter, $method:tt) => {
        fn $method(&mut self) -> Option<Self::Item> {
            let (n, v) = self.inner.$method()?;
            Some((n.as_str(), v.as_str()))
        }
    };

    (into_iter, $method:tt) => {
        fn $method(&mut self) -> Option<Self::Item> {
            self.inner.$method()
        }
    };

    (size_hint) => {
        fn size_hint(&self) -> (usize, Option<usize>) {
            self.inner.size_hint()
        }
    };

    (len) => {
        fn len(&self) -> usize {
            self.inner.len()
        }
    };
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);
    delegate!(iter, next);
    delegate!(size_hint);
}

impl DoubleEndedIterator for Iter<'_> {
    delegate!(iter, next_back);
}

impl Iterator for IntoIter {
    type Item = (String, String);
    delegate!(into_iter, next);
    delegate!(size_hint);
}

impl DoubleEndedIterator for IntoIter {
    delegate!(into_iter, next_back);
}

impl FusedIterator for Iter<'_> {}
impl FusedIterator for IntoIter {}

impl ExactSizeIterator for Iter<'_> {
    delegate!(len);
}

impl ExactSizeIterator for IntoIter {
    delegate!(len);
}
