use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [TimeRange::ShortTerm, TimeRange::MediumTerm, TimeRange::LongTerm];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

/// A kind of user data that is backed up to its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    CreatedPlaylists,
    StarredPlaylists,
    SavedAlbums,
    SavedTracks,
    SavedEpisodes,
    SavedShows,
    TopArtists(TimeRange),
    TopTracks(TimeRange),
    FollowedArtists,
}

/// Which playlists a playlist category keeps from the user's playlist listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    OwnedByUser,
    Any,
}

/// How a category's items are retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A single paginated listing. `wrapper` names the key the paging
    /// object is nested under, if any.
    Listing {
        path: String,
        wrapper: Option<&'static str>,
    },
    /// The user's playlist listing, filtered by owner, each playlist then
    /// expanded to its full track list.
    Playlists(OwnerFilter),
}

impl Category {
    pub fn all() -> Vec<Category> {
        let mut all = vec![
            Category::CreatedPlaylists,
            Category::StarredPlaylists,
            Category::SavedAlbums,
            Category::SavedTracks,
            Category::SavedEpisodes,
            Category::SavedShows,
        ];
        all.extend(TimeRange::ALL.iter().map(|r| Category::TopArtists(*r)));
        all.extend(TimeRange::ALL.iter().map(|r| Category::TopTracks(*r)));
        all.push(Category::FollowedArtists);
        all
    }

    pub fn name(&self) -> String {
        match self {
            Category::CreatedPlaylists => "playlists".to_string(),
            Category::StarredPlaylists => "starred_playlists".to_string(),
            Category::SavedAlbums => "saved_albums".to_string(),
            Category::SavedTracks => "saved_tracks".to_string(),
            Category::SavedEpisodes => "saved_episodes".to_string(),
            Category::SavedShows => "saved_shows".to_string(),
            Category::TopArtists(range) => format!("top_artists_{}", range.as_str()),
            Category::TopTracks(range) => format!("top_tracks_{}", range.as_str()),
            Category::FollowedArtists => "followed_artists".to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Playlists have a stable id and a content fingerprint, so their
    /// backups are merged entry by entry instead of replaced wholesale.
    pub fn is_playlist(&self) -> bool {
        matches!(self, Category::CreatedPlaylists | Category::StarredPlaylists)
    }

    pub fn source(&self, limit: u32) -> Source {
        let listing = |path: String| Source::Listing {
            path,
            wrapper: None,
        };

        match self {
            Category::CreatedPlaylists => Source::Playlists(OwnerFilter::OwnedByUser),
            Category::StarredPlaylists => Source::Playlists(OwnerFilter::Any),
            Category::SavedAlbums => listing(format!("/me/albums?limit={}", limit)),
            Category::SavedTracks => listing(format!("/me/tracks?limit={}", limit)),
            Category::SavedEpisodes => listing(format!("/me/episodes?limit={}", limit)),
            Category::SavedShows => listing(format!("/me/shows?limit={}", limit)),
            Category::TopArtists(range) => listing(format!(
                "/me/top/artists?time_range={}&limit={}",
                range.as_str(),
                limit
            )),
            Category::TopTracks(range) => listing(format!(
                "/me/top/tracks?time_range={}&limit={}",
                range.as_str(),
                limit
            )),
            Category::FollowedArtists => Source::Listing {
                path: format!("/me/following?type=artist&limit={}", limit),
                wrapper: Some("artists"),
            },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_end_matches(".json");
        Category::all()
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown category '{}'", s))
    }
}
