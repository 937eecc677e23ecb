use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "tconst,title,year,genre,director,actors,plot,country,awards,rating,votes";

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(file, "{}", line).expect("write line");
    }
    file
}

#[test]
fn loads_complete_rows_in_file_order() {
    let file = write_csv(&[
        HEADER,
        r#"tt0133093,The Matrix,1999,"Action, Sci-Fi",Lana Wachowski,"Keanu Reeves, Laurence Fishburne",A hacker learns the truth about reality.,United States,Won 4 Oscars,8.7,"2,100,000""#,
        r#"tt0338013,Eternal Sunshine of the Spotless Mind,2004,"Drama, Romance",Michel Gondry,"Jim Carrey, Kate Winslet",A couple erase each other from their memories.,United States,Won 1 Oscar,8.3,1100000"#,
    ]);

    let movies = load_movie_dataset(file.path()).expect("load CSV");

    assert_eq!(movies.len(), 2);
    assert_eq!(movies[0].tconst.as_deref(), Some("tt0133093"));
    assert_eq!(movies[0].title.as_deref(), Some("The Matrix"));
    assert_eq!(movies[0].year, Some(1999));
    assert_eq!(movies[0].genre.as_deref(), Some("Action, Sci-Fi"));
    assert_eq!(movies[0].votes, Some(2_100_000));
    assert!(movies[0].rating.is_some_and(|r| (r - 8.7).abs() < 1e-6));
    assert_eq!(movies[1].title.as_deref(), Some("Eternal Sunshine of the Spotless Mind"));
    assert_eq!(movies[1].votes, Some(1_100_000));
}

#[test]
fn empty_cells_become_none() {
    let file = write_csv(&[HEADER, "tt0000001,Untitled,,,,,,,,,"]);

    let movies = load_movie_dataset(file.path()).expect("load CSV");

    assert_eq!(movies.len(), 1);
    let movie = &movies[0];
    assert_eq!(movie.title.as_deref(), Some("Untitled"));
    assert!(movie.year.is_none());
    assert!(movie.plot.is_none());
    assert!(movie.genre.is_none());
    assert!(movie.director.is_none());
    assert!(movie.actors.is_none());
    assert!(movie.rating.is_none());
    assert!(movie.votes.is_none());
}

#[test]
fn unparsable_numbers_become_none() {
    let file = write_csv(&[HEADER, "tt0000002,Serial,2004–2008,Drama,,,,,,N/A,lots"]);

    let movies = load_movie_dataset(file.path()).expect("load CSV");

    assert!(movies[0].year.is_none());
    assert!(movies[0].rating.is_none());
    assert!(movies[0].votes.is_none());
    assert_eq!(movies[0].genre.as_deref(), Some("Drama"));
}

#[test]
fn missing_columns_are_tolerated() {
    let file = write_csv(&["title,plot", "Alien,A crew meets a deadly creature."]);

    let movies = load_movie_dataset(file.path()).expect("load CSV");

    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].title.as_deref(), Some("Alien"));
    assert!(movies[0].director.is_none());
    assert!(movies[0].tconst.is_none());
}

#[test]
fn missing_file_is_not_found() {
    let err = load_movie_dataset("/definitely/not/here/movies.csv").expect_err("should fail");

    match err {
        CinemateError::NotFound { path, .. } => {
            assert_eq!(path, Path::new("/definitely/not/here/movies.csv"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(
        load_movie_dataset("/definitely/not/here/movies.csv")
            .expect_err("should fail")
            .to_string()
            .contains("/definitely/not/here/movies.csv")
    );
}

#[test]
fn invalid_utf8_reports_dataset_error() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "{}", HEADER).expect("write header");
    file.write_all(b"tt1,\xff\xfe,1999,,,,,,,,\n").expect("write row");

    let err = load_movie_dataset(file.path()).expect_err("should fail");

    match err {
        CinemateError::Dataset(message) => assert!(message.contains("Malformed record")),
        other => panic!("expected Dataset error, got {other:?}"),
    }
}

#[test]
fn embedding_text_uses_fixed_label_order() {
    let movie = MovieRecord {
        plot: Some("Robots rise up".to_string()),
        genre: Some("Sci-Fi".to_string()),
        director: Some("Jane Doe".to_string()),
        actors: Some("A. Actor, B. Actor".to_string()),
        title: Some("Ignored Title".to_string()),
        ..MovieRecord::default()
    };

    assert_eq!(
        movie.embedding_text(),
        "Plot: Robots rise up. Genre: Sci-Fi. Director: Jane Doe. Actors: A. Actor, B. Actor"
    );
}

#[test]
fn embedding_text_substitutes_empty_strings() {
    let movie = MovieRecord::default();
    assert_eq!(
        movie.embedding_text(),
        "Plot: . Genre: . Director: . Actors: "
    );

    let partial = MovieRecord {
        genre: Some("Romance".to_string()),
        ..MovieRecord::default()
    };
    assert_eq!(
        partial.embedding_text(),
        "Plot: . Genre: Romance. Director: . Actors: "
    );
}

#[test]
fn embedding_text_ignores_display_only_fields() {
    let base = MovieRecord {
        plot: Some("Same plot".to_string()),
        ..MovieRecord::default()
    };
    let decorated = MovieRecord {
        title: Some("Different".to_string()),
        year: Some(2001),
        country: Some("France".to_string()),
        awards: Some("Many".to_string()),
        rating: Some(9.9),
        votes: Some(12),
        ..base.clone()
    };

    assert_eq!(base.embedding_text(), decorated.embedding_text());
}

#[test]
fn display_defaults() {
    let movie = MovieRecord::default();

    assert_eq!(movie.display_title(), "Unknown Title");
    assert_eq!(movie.display_year(), "Unknown Year");
    assert_eq!(movie.display_genre(), "Unknown Genre");
    assert_eq!(movie.display_director(), "Unknown Director");
    assert_eq!(movie.display_actors(), "Unknown Actors");
    assert_eq!(movie.display_country(), "Unknown Country");
    assert_eq!(movie.display_awards(), "No awards information available");
    assert_eq!(movie.display_rating(), "N/A");
    assert_eq!(movie.display_votes(), "N/A");
}

#[test]
fn display_present_values() {
    let movie = MovieRecord {
        year: Some(1982),
        rating: Some(8.1),
        votes: Some(800_000),
        ..MovieRecord::default()
    };

    assert_eq!(movie.display_year(), "1982");
    assert_eq!(movie.display_rating(), "8.1");
    assert_eq!(movie.display_votes(), "800000");
}
