use super::coords::{LatticeCoordinate, SiqadCoord};
use super::sidb::{Sidb, SiteKind};
use serde::{Deserialize, Serialize};

/// An ordered collection of dangling bonds on the H-Si(100)-2x1 surface.
///
/// The insertion order of the sites defines their index, which in turn defines
/// the digit order of the charge index (site `0` is the most significant digit).
/// Each coordinate hosts at most one site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidbLayout {
    sites: Vec<Sidb>,
}

impl SidbLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a layout from `(coordinate, kind)` pairs in the given order.
    ///
    /// Later entries for an already occupied coordinate overwrite its kind, and
    /// entries of kind [`SiteKind::Empty`] remove the site.
    pub fn from_sites<C, I>(sites: I) -> Self
    where
        C: LatticeCoordinate,
        I: IntoIterator<Item = (C, SiteKind)>,
    {
        let mut layout = Self::new();
        for (coord, kind) in sites {
            layout.assign_kind(coord, kind);
        }
        layout
    }

    /// Convenience constructor for layouts consisting only of normal sites.
    pub fn from_normal_sites<C, I>(coords: I) -> Self
    where
        C: LatticeCoordinate,
        I: IntoIterator<Item = C>,
    {
        Self::from_sites(coords.into_iter().map(|c| (c, SiteKind::Normal)))
    }

    /// Places a dangling bond of the given kind at `coord`.
    ///
    /// Returns the index of the site, or `None` if `kind` is
    /// [`SiteKind::Empty`] (in which case any existing site is removed).
    pub fn assign_kind<C: LatticeCoordinate>(&mut self, coord: C, kind: SiteKind) -> Option<usize> {
        let coord = coord.to_siqad();
        match (self.index_of(&coord), kind) {
            (Some(index), SiteKind::Empty) => {
                self.sites.remove(index);
                None
            }
            (None, SiteKind::Empty) => None,
            (Some(index), kind) => {
                self.sites[index].kind = kind;
                Some(index)
            }
            (None, kind) => {
                self.sites.push(Sidb::new(coord, kind));
                Some(self.sites.len() - 1)
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[inline]
    pub fn sites(&self) -> &[Sidb] {
        &self.sites
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sidb> {
        self.sites.iter()
    }

    pub fn site(&self, index: usize) -> Option<&Sidb> {
        self.sites.get(index)
    }

    pub fn index_of(&self, coord: &SiqadCoord) -> Option<usize> {
        self.sites.iter().position(|s| s.coord == *coord)
    }

    pub fn contains(&self, coord: &SiqadCoord) -> bool {
        self.index_of(coord).is_some()
    }

    /// Kind of the site at `coord`, [`SiteKind::Empty`] if unoccupied.
    pub fn kind_at(&self, coord: &SiqadCoord) -> SiteKind {
        self.index_of(coord)
            .map_or(SiteKind::Empty, |i| self.sites[i].kind)
    }

    pub fn coords_of_kind(&self, kind: SiteKind) -> Vec<SiqadCoord> {
        self.sites
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.coord)
            .collect()
    }

    pub fn num_of_kind(&self, kind: SiteKind) -> usize {
        self.sites.iter().filter(|s| s.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a SidbLayout {
    type Item = &'a Sidb;
    type IntoIter = std::slice::Iter<'a, Sidb>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::coords::OffsetCoord;

    #[test]
    fn assigning_empty_removes_site_and_shifts_indices() {
        let mut layout = SidbLayout::from_normal_sites([
            SiqadCoord::new(0, 0, 0),
            SiqadCoord::new(1, 0, 0),
            SiqadCoord::new(2, 0, 0),
        ]);
        assert_eq!(layout.assign_kind(SiqadCoord::new(1, 0, 0), SiteKind::Empty), None);
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.index_of(&SiqadCoord::new(2, 0, 0)), Some(1));
        assert_eq!(layout.kind_at(&SiqadCoord::new(1, 0, 0)), SiteKind::Empty);
    }

    #[test]
    fn reassigning_kind_keeps_index() {
        let mut layout = SidbLayout::from_normal_sites([
            SiqadCoord::new(0, 0, 0),
            SiqadCoord::new(4, 0, 0),
        ]);
        let index = layout.assign_kind(SiqadCoord::new(4, 0, 0), SiteKind::Output);
        assert_eq!(index, Some(1));
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.coords_of_kind(SiteKind::Output), vec![SiqadCoord::new(4, 0, 0)]);
    }

    #[test]
    fn offset_coordinates_are_stored_as_siqad() {
        let layout = SidbLayout::from_sites([(OffsetCoord::new(3, 5), SiteKind::Input)]);
        assert_eq!(layout.sites()[0].coord, SiqadCoord::new(3, 2, 1));
        assert_eq!(layout.num_of_kind(SiteKind::Input), 1);
    }
}
