use crate::models::{College, MentorListing};

/// Case-insensitive substring match over any of the fields. A blank query
/// matches everything.
pub fn matches_any<'a, I>(query: &str, fields: I) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn college_matches(college: &College, query: &str) -> bool {
    matches_any(
        query,
        [
            Some(college.name.as_str()),
            college.location.as_deref(),
            college.category.as_deref(),
        ],
    )
}

pub fn mentor_matches(mentor: &MentorListing, query: &str) -> bool {
    let named = [
        mentor.full_name.as_deref(),
        mentor.college_name.as_deref(),
        mentor.branch.as_deref(),
    ];
    matches_any(
        query,
        named
            .into_iter()
            .chain(mentor.expertise.iter().map(|tag| Some(tag.as_str()))),
    )
}

pub fn filter_colleges(colleges: Vec<College>, query: Option<&str>) -> Vec<College> {
    match query {
        Some(q) => colleges.into_iter().filter(|c| college_matches(c, q)).collect(),
        None => colleges,
    }
}

pub fn filter_mentors(mentors: Vec<MentorListing>, query: Option<&str>) -> Vec<MentorListing> {
    match query {
        Some(q) => mentors.into_iter().filter(|m| mentor_matches(m, q)).collect(),
        None => mentors,
    }
}
